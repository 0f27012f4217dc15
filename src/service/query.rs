//! Read-only vulnerability and scan queries

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use tracing::debug;

use crate::error::{PersistenceContext, Result};
use crate::storage::extractors::{parse_db_timestamp, parse_risk_factors};
use crate::storage::{
    Database, STATUS_ACTIVE, STATUS_FIXED, ScanResult, Statistics, Summary, Vulnerability,
    VulnerabilityFilters,
};

/// Limit applied to recent-scan listings when the caller passes zero or less
pub const DEFAULT_SCAN_LIMIT: i64 = 10;

// json_group_array over a LEFT JOIN yields [null] for vulnerabilities without
// risk factors; parse_risk_factors drops the nulls.
const VULNERABILITY_SELECT: &str = r#"
    SELECT
        v.vuln_id,
        v.scan_id,
        v.severity,
        v.cvss,
        v.status,
        v.package_name,
        v.current_version,
        v.fixed_version,
        v.description,
        v.published_date,
        v.link,
        json_group_array(rf.factor) AS risk_factors
    FROM vulnerabilities v
    LEFT JOIN risk_factors rf ON v.vuln_id = rf.vuln_id
    WHERE 1=1"#;

const VULNERABILITY_GROUP_ORDER: &str =
    " GROUP BY v.vuln_id ORDER BY v.published_date DESC, v.vuln_id";

/// Parameterized builder for vulnerability listings.
///
/// Each present, non-empty optional filter appends one `AND column = ?N`
/// predicate; required filters always do.
struct VulnerabilityQuery {
    sql: String,
    params: Vec<Box<dyn ToSql>>,
}

impl VulnerabilityQuery {
    fn new() -> Self {
        Self {
            sql: VULNERABILITY_SELECT.to_string(),
            params: Vec::new(),
        }
    }

    fn filter_eq(mut self, column: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.params.push(Box::new(value.to_string()));
            self.sql
                .push_str(&format!(" AND {} = ?{}", column, self.params.len()));
        }
        self
    }

    /// Unconditional `AND column = ?N`, for exact-match lookups by id
    fn filter_required(mut self, column: &'static str, value: &str) -> Self {
        self.params.push(Box::new(value.to_string()));
        self.sql
            .push_str(&format!(" AND {} = ?{}", column, self.params.len()));
        self
    }

    fn build(mut self) -> (String, Vec<Box<dyn ToSql>>) {
        self.sql.push_str(VULNERABILITY_GROUP_ORDER);
        (self.sql, self.params)
    }
}

/// Raw column values before timestamp and risk-factor decoding
struct VulnerabilityRow {
    id: String,
    scan_id: String,
    severity: String,
    cvss: f64,
    status: String,
    package_name: String,
    current_version: String,
    fixed_version: String,
    description: String,
    published_date: String,
    link: String,
    risk_factors: String,
}

impl VulnerabilityRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            scan_id: row.get(1)?,
            severity: row.get(2)?,
            cvss: row.get(3)?,
            status: row.get(4)?,
            package_name: row.get(5)?,
            current_version: row.get(6)?,
            fixed_version: row.get(7)?,
            description: row.get(8)?,
            published_date: row.get(9)?,
            link: row.get(10)?,
            risk_factors: row.get(11)?,
        })
    }

    fn into_vulnerability(self) -> Result<Vulnerability> {
        Ok(Vulnerability {
            published_date: parse_db_timestamp(&self.published_date)?,
            risk_factors: parse_risk_factors(&self.risk_factors)?,
            id: self.id,
            scan_id: Some(self.scan_id),
            severity: self.severity,
            cvss: self.cvss,
            status: self.status,
            package_name: self.package_name,
            current_version: self.current_version,
            fixed_version: self.fixed_version,
            description: self.description,
            link: self.link,
        })
    }
}

/// Raw scan columns plus the joined vulnerability count
struct ScanRow {
    scan_id: String,
    timestamp: String,
    scan_status: String,
    resource_type: String,
    resource_name: String,
    vuln_count: i64,
}

impl ScanRow {
    fn into_scan(self, vulnerabilities: Vec<Vulnerability>, summary: Summary) -> Result<ScanResult> {
        Ok(ScanResult {
            timestamp: parse_db_timestamp(&self.timestamp)?,
            scan_id: self.scan_id,
            scan_status: self.scan_status,
            resource_type: self.resource_type,
            resource_name: self.resource_name,
            vulnerabilities,
            summary,
        })
    }
}

/// Filtered and aggregated reads over scans and vulnerabilities.
///
/// Each method runs independent statements without a surrounding transaction.
#[derive(Clone)]
pub struct ScanQueries {
    pub(super) db: Database,
}

impl ScanQueries {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// List vulnerabilities matching every present filter, newest publication first
    pub fn list_vulnerabilities(&self, filters: &VulnerabilityFilters) -> Result<Vec<Vulnerability>> {
        let (sql, sql_params) = VulnerabilityQuery::new()
            .filter_eq("v.severity", filters.severity.as_deref())
            .filter_eq("v.status", filters.status.as_deref())
            .filter_eq("v.package_name", filters.package_name.as_deref())
            .build();

        debug!(params = sql_params.len(), "Querying vulnerabilities");

        let conn = self.db.lock()?;
        fetch_vulnerabilities(&conn, &sql, &sql_params)
    }

    /// Look up one vulnerability; `None` when no row matches
    pub fn get_vulnerability(&self, id: &str) -> Result<Option<Vulnerability>> {
        let (sql, sql_params) = VulnerabilityQuery::new()
            .filter_required("v.vuln_id", id)
            .build();

        let conn = self.db.lock()?;
        let params_refs: Vec<&dyn ToSql> = sql_params.iter().map(|p| p.as_ref()).collect();

        let row = conn
            .query_row(&sql, params_refs.as_slice(), VulnerabilityRow::from_row)
            .optional()
            .context("failed to get vulnerability")?;

        row.map(VulnerabilityRow::into_vulnerability).transpose()
    }

    /// Live totals: scans, per-severity counts, active and fixed counts
    pub fn statistics(&self) -> Result<Statistics> {
        let conn = self.db.lock()?;

        let total_scans: i64 = conn
            .query_row("SELECT COUNT(*) FROM scan_results", [], |row| row.get(0))
            .context("failed to get total scans")?;

        let mut stmt = conn
            .prepare("SELECT severity, COUNT(*) FROM vulnerabilities GROUP BY severity")
            .context("failed to get severity counts")?;
        let vulnerabilities_by_severity = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .context("failed to get severity counts")?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .context("failed to scan severity row")?;

        let (active_vulnerabilities, fixed_vulnerabilities): (i64, i64) = conn
            .query_row(
                r#"
                SELECT
                    COUNT(*) FILTER (WHERE status = ?1),
                    COUNT(*) FILTER (WHERE status = ?2)
                FROM vulnerabilities
                "#,
                params![STATUS_ACTIVE, STATUS_FIXED],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("failed to get vulnerability counts")?;

        Ok(Statistics {
            total_scans,
            vulnerabilities_by_severity,
            active_vulnerabilities,
            fixed_vulnerabilities,
        })
    }

    /// Most recent scans with their vulnerability counts.
    ///
    /// Only `summary.total_vulnerabilities` is filled in and the embedded
    /// vulnerability list stays empty.
    pub fn recent_scans(&self, limit: i64) -> Result<Vec<ScanResult>> {
        let limit = if limit <= 0 { DEFAULT_SCAN_LIMIT } else { limit };

        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT
                    sr.scan_id,
                    sr.timestamp,
                    sr.scan_status,
                    sr.resource_type,
                    sr.resource_name,
                    COUNT(v.vuln_id) AS vuln_count
                FROM scan_results sr
                LEFT JOIN vulnerabilities v ON sr.scan_id = v.scan_id
                GROUP BY sr.scan_id
                ORDER BY sr.timestamp DESC, sr.scan_id
                LIMIT ?1
                "#,
            )
            .context("failed to get recent scans")?;

        let rows = stmt
            .query_map(params![limit], scan_row)
            .context("failed to get recent scans")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to scan row")?;

        rows.into_iter()
            .map(|row| {
                let summary = Summary::with_total(row.vuln_count);
                row.into_scan(Vec::new(), summary)
            })
            .collect()
    }

    /// One scan with its currently attributed vulnerabilities and a full summary
    pub fn get_scan(&self, scan_id: &str) -> Result<Option<ScanResult>> {
        let conn = self.db.lock()?;

        let row = conn
            .query_row(
                r#"
                SELECT scan_id, timestamp, scan_status, resource_type, resource_name, 0
                FROM scan_results
                WHERE scan_id = ?1
                "#,
                params![scan_id],
                scan_row,
            )
            .optional()
            .context("failed to get scan result")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let (sql, sql_params) = VulnerabilityQuery::new()
            .filter_required("v.scan_id", scan_id)
            .build();
        let vulnerabilities = fetch_vulnerabilities(&conn, &sql, &sql_params)?;

        let summary = Summary::from_vulnerabilities(&vulnerabilities);
        row.into_scan(vulnerabilities, summary).map(Some)
    }
}

fn fetch_vulnerabilities(
    conn: &Connection,
    sql: &str,
    sql_params: &[Box<dyn ToSql>],
) -> Result<Vec<Vulnerability>> {
    let params_refs: Vec<&dyn ToSql> = sql_params.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(sql).context("failed to query vulnerabilities")?;
    let rows = stmt
        .query_map(params_refs.as_slice(), VulnerabilityRow::from_row)
        .context("failed to query vulnerabilities")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to scan vulnerability row")?;

    rows.into_iter()
        .map(VulnerabilityRow::into_vulnerability)
        .collect()
}

fn scan_row(row: &Row<'_>) -> rusqlite::Result<ScanRow> {
    Ok(ScanRow {
        scan_id: row.get(0)?,
        timestamp: row.get(1)?,
        scan_status: row.get(2)?,
        resource_type: row.get(3)?,
        resource_name: row.get(4)?,
        vuln_count: row.get(5)?,
    })
}
