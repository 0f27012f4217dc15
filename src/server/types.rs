//! Request and response types for API endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::service::{DEFAULT_SCAN_LIMIT, DEFAULT_TREND_DAYS, TrendSeries};
use crate::storage::VulnerabilityFilters;

/// Query parameters for the vulnerability list endpoint
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Filter by severity (exact match)
    #[param(example = "HIGH")]
    pub severity: Option<String>,
    /// Filter by status (exact match)
    #[param(example = "active")]
    pub status: Option<String>,
    /// Filter by package name (exact match)
    #[param(example = "openssl")]
    pub package: Option<String>,
}

impl ListQuery {
    pub fn to_filters(&self) -> VulnerabilityFilters {
        VulnerabilityFilters {
            severity: self.severity.clone(),
            status: self.status.clone(),
            package_name: self.package.clone(),
        }
    }
}

/// Query parameters for the recent scans endpoint
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScansQuery {
    /// Maximum number of scans (default: 10)
    #[param(value_type = Option<i64>, example = 10)]
    pub limit: Option<String>,
}

impl ScansQuery {
    /// Absent or non-numeric values fall back to the default
    pub fn limit(&self) -> i64 {
        parse_or(self.limit.as_deref(), DEFAULT_SCAN_LIMIT)
    }
}

/// Query parameters for the trend endpoint
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendQuery {
    /// Window length in days (default: 30)
    #[param(value_type = Option<i64>, example = 7)]
    pub days: Option<String>,
}

impl TrendQuery {
    pub fn days(&self) -> i64 {
        parse_or(self.days.as_deref(), DEFAULT_TREND_DAYS)
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    #[schema(example = "Vulnerability not found")]
    pub error: String,
}

/// Health response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "connected")]
    pub database: String,
}

/// Acknowledgement for an accepted batch
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Scan results processed successfully")]
    pub message: String,
}

/// Daily counts per severity; each array holds one entry per day, oldest first
#[derive(Serialize, ToSchema)]
#[schema(example = json!({"HIGH": [0, 1, 2], "LOW": [0, 0, 1]}))]
pub struct TrendResponse(pub TrendSeries);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_to_filters() {
        let query = ListQuery {
            severity: Some("HIGH".to_string()),
            status: None,
            package: Some("openssl".to_string()),
        };

        let filters = query.to_filters();
        assert_eq!(filters.severity.as_deref(), Some("HIGH"));
        assert!(filters.status.is_none());
        assert_eq!(filters.package_name.as_deref(), Some("openssl"));
    }

    #[test]
    fn test_scans_query_limit() {
        let limit = |raw: Option<&str>| {
            ScansQuery {
                limit: raw.map(str::to_string),
            }
            .limit()
        };

        assert_eq!(limit(None), 10);
        assert_eq!(limit(Some("3")), 3);
        assert_eq!(limit(Some("abc")), 10);
        assert_eq!(limit(Some("")), 10);
    }

    #[test]
    fn test_trend_query_days() {
        assert_eq!(TrendQuery::default().days(), 30);
        assert_eq!(
            TrendQuery {
                days: Some("7".to_string())
            }
            .days(),
            7
        );
        assert_eq!(
            TrendQuery {
                days: Some("week".to_string())
            }
            .days(),
            30
        );
    }

    #[test]
    fn test_trend_response_serializes_as_map() {
        let mut series = TrendSeries::new();
        series.insert("HIGH".to_string(), vec![0, 2]);

        let value = serde_json::to_value(TrendResponse(series)).unwrap();
        assert_eq!(value, serde_json::json!({"HIGH": [0, 2]}));
    }
}
