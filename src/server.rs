//! HTTP layer for vulnboard
//!
//! # Module Structure
//! - `handlers`: HTTP request handlers
//! - `state`: Application state
//! - `types`: Request and response types
//! - `error`: Error to response mapping

mod error;
mod handlers;
mod state;
mod types;

pub use error::ApiError;
pub use handlers::{
    get_scan, get_stats, get_trends, get_vulnerability, health, list_scans,
    list_vulnerabilities, submit_scans,
};
pub use state::AppState;
pub use types::{
    ErrorResponse, HealthResponse, ListQuery, MessageResponse, ScansQuery, TrendQuery,
    TrendResponse,
};

use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    Router,
    http::{Method, header},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;

use crate::config::Config;
use crate::metrics::metrics_handler;
use crate::storage::{Database, ScanResult, Statistics, Summary, Vulnerability};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "vulnboard API",
        description = "Vulnerability scan ingestion and query API",
        version = env!("CARGO_PKG_VERSION"),
        license(name = "MIT")
    ),
    paths(
        handlers::health,
        handlers::submit_scans,
        handlers::list_vulnerabilities,
        handlers::get_vulnerability,
        handlers::get_stats,
        handlers::list_scans,
        handlers::get_scan,
        handlers::get_trends,
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        MessageResponse,
        TrendResponse,
        ScanResult,
        Vulnerability,
        Summary,
        Statistics,
    )),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Scans", description = "Scan ingestion and listing endpoints"),
        (name = "Vulnerabilities", description = "Vulnerability lookup endpoints"),
        (name = "Statistics", description = "Aggregate and trend endpoints"),
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/scan", post(submit_scans))
        .route("/api/vulnerabilities", get(list_vulnerabilities))
        .route("/api/vulnerabilities/{id}", get(get_vulnerability))
        .route("/api/stats", get(get_stats))
        .route("/api/scans", get(list_scans))
        .route("/api/scans/{scan_id}", get(get_scan))
        .route("/api/trends", get(get_trends))
        .route("/metrics", get(metrics_handler))
        // OpenAPI documentation
        .route("/api-docs/openapi.json", get(serve_openapi))
        .layer(cors)
        .with_state(state)
}

pub async fn run(
    config: Config,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<()> {
    info!(
        port = config.server_port,
        storage_path = %config.storage_path,
        database_file = %config.database_file,
        "Starting server"
    );

    let db = Database::new(&config.get_db_path())?;
    let app = build_router(AppState::new(db));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
            info!("Server shutting down");
        })
        .await?;

    Ok(())
}

async fn serve_openapi() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        ApiDoc::openapi().to_json().unwrap_or_default(),
    )
}
