//! Database schema initialization

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Tables owned by the service, in dependency order
pub const TABLES: [&str; 3] = ["scan_results", "vulnerabilities", "risk_factors"];

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    debug!("Initializing database schema");

    // Risk factors reference their vulnerability; SQLite only enforces that per connection.
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("Failed to enable foreign keys")?;

    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='scan_results'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if table_exists {
        debug!("Schema already present");
    } else {
        info!("Creating new database schema");
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS scan_results (
            scan_id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            scan_status TEXT NOT NULL DEFAULT '',
            resource_type TEXT NOT NULL DEFAULT '',
            resource_name TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS vulnerabilities (
            vuln_id TEXT PRIMARY KEY,
            scan_id TEXT NOT NULL,
            severity TEXT NOT NULL DEFAULT '',
            cvss REAL NOT NULL DEFAULT 0 CHECK (cvss >= 0 AND cvss <= 10),
            status TEXT NOT NULL DEFAULT '',
            package_name TEXT NOT NULL DEFAULT '',
            current_version TEXT NOT NULL DEFAULT '',
            fixed_version TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            published_date TEXT NOT NULL,
            link TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS risk_factors (
            vuln_id TEXT NOT NULL REFERENCES vulnerabilities(vuln_id) ON DELETE CASCADE,
            factor TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scan_results_timestamp ON scan_results(timestamp);
        CREATE INDEX IF NOT EXISTS idx_vulnerabilities_scan_id ON vulnerabilities(scan_id);
        CREATE INDEX IF NOT EXISTS idx_vulnerabilities_severity ON vulnerabilities(severity);
        CREATE INDEX IF NOT EXISTS idx_vulnerabilities_status ON vulnerabilities(status);
        CREATE INDEX IF NOT EXISTS idx_vulnerabilities_package ON vulnerabilities(package_name);
        CREATE INDEX IF NOT EXISTS idx_vulnerabilities_published ON vulnerabilities(published_date);
        CREATE INDEX IF NOT EXISTS idx_risk_factors_vuln_id ON risk_factors(vuln_id);
        "#,
    )
    .context("Failed to initialize database schema")?;

    let index_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    debug!(
        tables = ?TABLES,
        indexes = index_count,
        "Database schema initialized"
    );

    Ok(())
}
