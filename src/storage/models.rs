//! Data models shared by ingestion, queries and the HTTP layer

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status value counted as active in statistics
pub const STATUS_ACTIVE: &str = "active";
/// Status value counted as fixed in statistics
pub const STATUS_FIXED: &str = "fixed";

/// Severities that make a scan non-compliant while still active
const BLOCKING_SEVERITIES: [&str; 2] = ["CRITICAL", "HIGH"];

/// One scanner run against a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ScanResult {
    /// Unique scan identifier
    #[schema(example = "scan_20250101_001")]
    pub scan_id: String,
    /// When the scan ran
    pub timestamp: DateTime<Utc>,
    /// Scanner-reported status
    #[schema(example = "completed")]
    pub scan_status: String,
    /// Kind of resource scanned
    #[schema(example = "container")]
    pub resource_type: String,
    /// Resource name
    #[schema(example = "payment-processor:latest")]
    pub resource_name: String,
    /// Vulnerabilities found by this scan
    pub vulnerabilities: Vec<Vulnerability>,
    /// Derived summary, computed per response
    pub summary: Summary,
}

/// A single security issue found during a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Vulnerability {
    /// Vulnerability identifier
    #[schema(example = "CVE-2024-1234")]
    pub id: String,
    /// Scan that last reported this vulnerability (read paths only)
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
    #[schema(example = "HIGH")]
    pub severity: String,
    #[schema(example = 8.5)]
    pub cvss: f64,
    #[schema(example = "active")]
    pub status: String,
    #[schema(example = "openssl")]
    pub package_name: String,
    #[schema(example = "1.1.1t-r0")]
    pub current_version: String,
    #[schema(example = "1.1.1u-r0")]
    pub fixed_version: String,
    pub description: String,
    pub published_date: DateTime<Utc>,
    pub link: String,
    /// Free-text risk tags
    #[schema(example = json!(["Remote Code Execution", "High CVSS Score"]))]
    pub risk_factors: Vec<String>,
}

/// Derived per-scan summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Summary {
    pub total_vulnerabilities: i64,
    pub severity_counts: BTreeMap<String, i64>,
    pub fixable_count: i64,
    pub compliant: bool,
}

impl Summary {
    /// Summary carrying only a vulnerability count, as returned by recent-scan listings
    pub fn with_total(total_vulnerabilities: i64) -> Self {
        Self {
            total_vulnerabilities,
            ..Default::default()
        }
    }

    /// Compute the full summary for a set of vulnerabilities
    pub fn from_vulnerabilities(vulnerabilities: &[Vulnerability]) -> Self {
        let mut severity_counts = BTreeMap::new();
        let mut fixable_count = 0;
        let mut compliant = true;

        for vuln in vulnerabilities {
            *severity_counts.entry(vuln.severity.clone()).or_insert(0) += 1;
            if !vuln.fixed_version.is_empty() {
                fixable_count += 1;
            }
            if vuln.status == STATUS_ACTIVE
                && BLOCKING_SEVERITIES
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(&vuln.severity))
            {
                compliant = false;
            }
        }

        Self {
            total_vulnerabilities: vulnerabilities.len() as i64,
            severity_counts,
            fixable_count,
            compliant,
        }
    }
}

/// Optional equality filters for vulnerability listings.
/// Absent and empty values both mean "no restriction".
#[derive(Debug, Default, Clone)]
pub struct VulnerabilityFilters {
    pub severity: Option<String>,
    pub status: Option<String>,
    pub package_name: Option<String>,
}

/// Live statistics over the current table state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Statistics {
    pub total_scans: i64,
    pub vulnerabilities_by_severity: BTreeMap<String, i64>,
    pub active_vulnerabilities: i64,
    pub fixed_vulnerabilities: i64,
}
