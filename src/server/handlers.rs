//! HTTP request handlers for API endpoints

use std::time::Instant;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::{debug, info, warn};

use crate::storage::{ScanResult, Statistics, Vulnerability};

use super::error::ApiError;
use super::state::AppState;
use super::types::{
    ErrorResponse, HealthResponse, ListQuery, MessageResponse, ScansQuery, TrendQuery,
    TrendResponse,
};

/// Health check that round-trips the database
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthResponse),
        (status = 500, description = "Database unreachable", body = ErrorResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state
        .db
        .ping()
        .map_err(|e| ApiError::Unavailable("Database connection failed", e))?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        database: "connected".to_string(),
    }))
}

/// Ingest a batch of scan results in one transaction
#[utoipa::path(
    post,
    path = "/api/scan",
    tag = "Scans",
    request_body = Vec<ScanResult>,
    responses(
        (status = 201, description = "Batch committed", body = MessageResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 500, description = "Batch rejected or rolled back", body = ErrorResponse)
    )
)]
pub async fn submit_scans(
    State(state): State<AppState>,
    payload: Result<Json<Vec<ScanResult>>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(scans) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected scan payload");
        ApiError::BadRequest("Invalid request payload")
    })?;

    debug!(scans = scans.len(), "Received scan batch");

    let started = Instant::now();
    let report = match state.ingestor.process_batch(&scans) {
        Ok(report) => {
            state.metrics.record_success(&report, started.elapsed());
            report
        }
        Err(e) => {
            state.metrics.record_failure(started.elapsed());
            return Err(e.into());
        }
    };

    info!(
        scans = report.scans,
        vulnerabilities = report.vulnerabilities,
        "Scan batch accepted"
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Scan results processed successfully".to_string(),
        }),
    ))
}

/// List vulnerabilities with optional exact-match filters
#[utoipa::path(
    get,
    path = "/api/vulnerabilities",
    tag = "Vulnerabilities",
    params(ListQuery),
    responses(
        (status = 200, description = "Matching vulnerabilities, newest first", body = Vec<Vulnerability>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_vulnerabilities(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Vulnerability>>, ApiError> {
    let vulnerabilities = state.queries.list_vulnerabilities(&query.to_filters())?;
    Ok(Json(vulnerabilities))
}

/// Get a single vulnerability
#[utoipa::path(
    get,
    path = "/api/vulnerabilities/{id}",
    tag = "Vulnerabilities",
    params(
        ("id" = String, Path, description = "Vulnerability identifier, e.g. a CVE id")
    ),
    responses(
        (status = 200, description = "Vulnerability details", body = Vulnerability),
        (status = 404, description = "Vulnerability not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_vulnerability(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vulnerability>, ApiError> {
    state
        .queries
        .get_vulnerability(&id)?
        .map(Json)
        .ok_or(ApiError::NotFound("Vulnerability not found"))
}

/// Aggregate statistics
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "Statistics",
    responses(
        (status = 200, description = "Scan and vulnerability totals", body = Statistics),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Statistics>, ApiError> {
    Ok(Json(state.queries.statistics()?))
}

/// Most recent scans
#[utoipa::path(
    get,
    path = "/api/scans",
    tag = "Scans",
    params(ScansQuery),
    responses(
        (status = 200, description = "Recent scans, newest first; summaries carry only the total", body = Vec<ScanResult>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_scans(
    State(state): State<AppState>,
    Query(query): Query<ScansQuery>,
) -> Result<Json<Vec<ScanResult>>, ApiError> {
    Ok(Json(state.queries.recent_scans(query.limit())?))
}

/// A single scan with its vulnerabilities and full summary
#[utoipa::path(
    get,
    path = "/api/scans/{scan_id}",
    tag = "Scans",
    params(
        ("scan_id" = String, Path, description = "Scan identifier")
    ),
    responses(
        (status = 200, description = "Scan details", body = ScanResult),
        (status = 404, description = "Scan not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<ScanResult>, ApiError> {
    state
        .queries
        .get_scan(&scan_id)?
        .map(Json)
        .ok_or(ApiError::NotFound("Scan not found"))
}

/// Daily publication counts per severity
#[utoipa::path(
    get,
    path = "/api/trends",
    tag = "Statistics",
    params(TrendQuery),
    responses(
        (status = 200, description = "One count per day for each severity seen", body = TrendResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, ApiError> {
    let trends = state.queries.vulnerability_trends(query.days())?;
    Ok(Json(TrendResponse(trends)))
}
