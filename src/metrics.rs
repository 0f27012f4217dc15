//! Prometheus metrics for scan ingestion.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::service::IngestReport;

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Labels for ingest batch metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BatchLabels {
    pub result: String,
}

impl BatchLabels {
    fn success() -> Self {
        Self {
            result: "success".to_string(),
        }
    }

    fn failure() -> Self {
        Self {
            result: "failure".to_string(),
        }
    }
}

/// All Prometheus metrics for the service.
pub struct Metrics {
    pub ingest_batches_total: Family<BatchLabels, Counter>,
    pub ingested_scans_total: Counter,
    pub ingested_vulnerabilities_total: Counter,
    pub ingest_duration_seconds: Histogram,
}

const INGEST_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

impl Metrics {
    /// Create and register all metrics with the given registry.
    pub fn new(registry: &mut Registry) -> Self {
        let ingest_batches_total = Family::<BatchLabels, Counter>::default();
        registry.register(
            "vulnboard_ingest_batches",
            "Total number of scan batches submitted for ingestion",
            ingest_batches_total.clone(),
        );

        let ingested_scans_total = Counter::default();
        registry.register(
            "vulnboard_ingested_scans",
            "Total number of scan results committed",
            ingested_scans_total.clone(),
        );

        let ingested_vulnerabilities_total = Counter::default();
        registry.register(
            "vulnboard_ingested_vulnerabilities",
            "Total number of vulnerabilities committed",
            ingested_vulnerabilities_total.clone(),
        );

        let ingest_duration_seconds = Histogram::new(INGEST_BUCKETS.iter().copied());
        registry.register(
            "vulnboard_ingest_duration_seconds",
            "Duration of batch ingestion in seconds",
            ingest_duration_seconds.clone(),
        );

        Self {
            ingest_batches_total,
            ingested_scans_total,
            ingested_vulnerabilities_total,
            ingest_duration_seconds,
        }
    }

    /// Record a committed batch.
    pub fn record_success(&self, report: &IngestReport, elapsed: Duration) {
        self.ingest_batches_total
            .get_or_create(&BatchLabels::success())
            .inc();
        self.ingested_scans_total.inc_by(report.scans as u64);
        self.ingested_vulnerabilities_total
            .inc_by(report.vulnerabilities as u64);
        self.ingest_duration_seconds.observe(elapsed.as_secs_f64());
    }

    /// Record a rejected or rolled back batch.
    pub fn record_failure(&self, elapsed: Duration) {
        self.ingest_batches_total
            .get_or_create(&BatchLabels::failure())
            .inc();
        self.ingest_duration_seconds.observe(elapsed.as_secs_f64());
    }
}

/// Axum handler that encodes the registry as OpenMetrics text.
pub async fn metrics_handler(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let mut buf = String::new();
    if encode(&mut buf, &registry).is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Failed to encode metrics".to_string(),
        );
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
        buf,
    )
}
