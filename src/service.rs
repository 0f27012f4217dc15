//! Scan ingestion and read-side queries
//!
//! # Module Structure
//! - `ingest`: Transactional batch upsert of scan results
//! - `query`: Vulnerability, scan and statistics lookups
//! - `trends`: Day-bucketed publication counts per severity

mod ingest;
mod query;
mod trends;

pub use ingest::{IngestReport, ScanIngestor};
pub use query::{DEFAULT_SCAN_LIMIT, ScanQueries};
pub use trends::{DEFAULT_TREND_DAYS, MAX_TREND_DAYS, TrendSeries};
