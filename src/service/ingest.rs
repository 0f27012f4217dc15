//! Transactional batch ingestion of scan results

use rusqlite::{Transaction, params};
use tracing::{debug, error, info};

use crate::error::{PersistenceContext, Result, ScanError};
use crate::storage::extractors::to_db_timestamp;
use crate::storage::{Database, ScanResult, Vulnerability};

/// Row counts written by one committed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub scans: usize,
    pub vulnerabilities: usize,
    pub risk_factors: usize,
}

/// Upserts scan batches into the database, one transaction per batch.
#[derive(Clone)]
pub struct ScanIngestor {
    db: Database,
}

impl ScanIngestor {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Upsert every scan and vulnerability in `scans`, replacing each
    /// vulnerability's risk factors.
    ///
    /// Scans are applied in list order and vulnerabilities in their list
    /// order, so a vulnerability id repeated within the batch ends up
    /// attributed to the last scan that carried it. Any failure rolls back
    /// the whole batch.
    pub fn process_batch(&self, scans: &[ScanResult]) -> Result<IngestReport> {
        if scans.is_empty() {
            return Err(ScanError::validation("no scan results provided"));
        }

        debug!(scans = scans.len(), "Processing scan batch");

        let mut conn = self.db.lock()?;
        let tx = conn
            .transaction()
            .context("failed to begin transaction")?;

        let mut report = IngestReport::default();

        for scan in scans {
            upsert_scan(&tx, scan)
                .map_err(|e| {
                    error!(scan_id = %scan.scan_id, error = %e, "Scan upsert failed, rolling back batch");
                    e
                })
                .context("failed to insert scan result")?;
            report.scans += 1;

            for vuln in &scan.vulnerabilities {
                let factors = upsert_vulnerability(&tx, &scan.scan_id, vuln)
                    .map_err(|e| {
                        error!(
                            scan_id = %scan.scan_id,
                            vuln_id = %vuln.id,
                            error = %e,
                            "Vulnerability upsert failed, rolling back batch"
                        );
                        e
                    })
                    .context("failed to process vulnerability")?;
                report.vulnerabilities += 1;
                report.risk_factors += factors;
            }
        }

        tx.commit().context("failed to commit transaction")?;

        info!(
            scans = report.scans,
            vulnerabilities = report.vulnerabilities,
            risk_factors = report.risk_factors,
            "Scan batch stored"
        );

        Ok(report)
    }
}

fn upsert_scan(tx: &Transaction<'_>, scan: &ScanResult) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        r#"
        INSERT INTO scan_results (scan_id, timestamp, scan_status, resource_type, resource_name)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(scan_id) DO UPDATE SET
            timestamp = excluded.timestamp,
            scan_status = excluded.scan_status,
            resource_type = excluded.resource_type,
            resource_name = excluded.resource_name
        "#,
    )?;
    stmt.execute(params![
        scan.scan_id,
        to_db_timestamp(&scan.timestamp),
        scan.scan_status,
        scan.resource_type,
        scan.resource_name,
    ])?;
    Ok(())
}

/// Upsert one vulnerability and replace its risk factors.
/// Returns the number of risk-factor rows inserted.
fn upsert_vulnerability(
    tx: &Transaction<'_>,
    scan_id: &str,
    vuln: &Vulnerability,
) -> rusqlite::Result<usize> {
    let mut stmt = tx.prepare_cached(
        r#"
        INSERT INTO vulnerabilities (
            vuln_id, scan_id, severity, cvss, status,
            package_name, current_version, fixed_version,
            description, published_date, link
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(vuln_id) DO UPDATE SET
            scan_id = excluded.scan_id,
            severity = excluded.severity,
            cvss = excluded.cvss,
            status = excluded.status,
            package_name = excluded.package_name,
            current_version = excluded.current_version,
            fixed_version = excluded.fixed_version,
            description = excluded.description,
            published_date = excluded.published_date,
            link = excluded.link
        "#,
    )?;
    stmt.execute(params![
        vuln.id,
        scan_id,
        vuln.severity,
        vuln.cvss,
        vuln.status,
        vuln.package_name,
        vuln.current_version,
        vuln.fixed_version,
        vuln.description,
        to_db_timestamp(&vuln.published_date),
        vuln.link,
    ])?;

    tx.prepare_cached("DELETE FROM risk_factors WHERE vuln_id = ?1")?
        .execute(params![vuln.id])?;

    let mut insert = tx.prepare_cached("INSERT INTO risk_factors (vuln_id, factor) VALUES (?1, ?2)")?;
    for factor in &vuln.risk_factors {
        insert.execute(params![vuln.id, factor])?;
    }

    debug!(
        scan_id = %scan_id,
        vuln_id = %vuln.id,
        risk_factors = vuln.risk_factors.len(),
        "Vulnerability upserted"
    );

    Ok(vuln.risk_factors.len())
}
