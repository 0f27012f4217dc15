//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use prometheus_client::registry::Registry;

use crate::metrics::Metrics;
use crate::service::{ScanIngestor, ScanQueries};
use crate::storage::Database;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ingestor: ScanIngestor,
    pub queries: ScanQueries,
    pub metrics: Arc<Metrics>,
    pub registry: Arc<Registry>,
}

impl AppState {
    /// Wire the ingestor, queries and a fresh metrics registry around `db`
    pub fn new(db: Database) -> Self {
        let mut registry = Registry::default();
        let metrics = Arc::new(Metrics::new(&mut registry));

        Self {
            ingestor: ScanIngestor::new(db.clone()),
            queries: ScanQueries::new(db.clone()),
            db,
            metrics,
            registry: Arc::new(registry),
        }
    }
}

impl FromRef<AppState> for Arc<Registry> {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}
