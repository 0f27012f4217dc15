//! Storage layer for vulnboard
//!
//! SQLite persistence for scan results, vulnerabilities and risk factors.
//!
//! # Module Structure
//! - `database`: Connection and lifecycle management
//! - `models`: Data types shared with the service and HTTP layers
//! - `schema`: Table and index creation
//! - `extractors`: Stored-text decoding helpers (timestamps, risk factors)

mod database;
pub(crate) mod extractors;
mod models;
mod schema;

pub use database::Database;
pub use extractors::parse_risk_factors;
pub use models::{
    STATUS_ACTIVE, STATUS_FIXED, ScanResult, Statistics, Summary, Vulnerability,
    VulnerabilityFilters,
};
