//! Day-bucketed vulnerability trends

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::params;
use tracing::debug;

use super::query::ScanQueries;
use crate::error::{PersistenceContext, Result, ScanError};
use crate::storage::extractors::to_db_timestamp;

/// Window used when the caller passes zero or fewer days
pub const DEFAULT_TREND_DAYS: i64 = 30;

/// Largest window accepted; each severity allocates one slot per day
pub const MAX_TREND_DAYS: i64 = 3650;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Per-severity daily counts; index 0 is the oldest day, `days - 1` is today
pub type TrendSeries = BTreeMap<String, Vec<i64>>;

impl ScanQueries {
    /// Daily publication counts per severity over the last `days` days
    pub fn vulnerability_trends(&self, days: i64) -> Result<TrendSeries> {
        self.vulnerability_trends_at(days, Utc::now())
    }

    /// Same as [`vulnerability_trends`](Self::vulnerability_trends) with an explicit clock.
    ///
    /// Each (day, severity) count lands at `days - floor(hours_since_day / 24) - 1`.
    /// Days are truncated in UTC. A count whose index falls outside `[0, days)`
    /// is dropped, but its severity still gets a zeroed series.
    pub fn vulnerability_trends_at(&self, days: i64, now: DateTime<Utc>) -> Result<TrendSeries> {
        let days = if days <= 0 { DEFAULT_TREND_DAYS } else { days };
        if days > MAX_TREND_DAYS {
            return Err(ScanError::validation(format!(
                "trend window of {days} days exceeds {MAX_TREND_DAYS}"
            )));
        }
        let window_start = now - Duration::days(days);

        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT date(published_date) AS day, severity, COUNT(*) AS count
                FROM vulnerabilities
                WHERE published_date >= ?1
                  AND date(published_date) <= date(?2)
                GROUP BY day, severity
                ORDER BY day, severity
                "#,
            )
            .context("failed to get vulnerability trends")?;

        let rows = stmt
            .query_map(
                params![to_db_timestamp(&window_start), to_db_timestamp(&now)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .context("failed to get vulnerability trends")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to scan trend row")?;

        let bucket_count = days as usize;
        let mut trends = TrendSeries::new();

        for (day, severity, count) in rows {
            let series = trends
                .entry(severity)
                .or_insert_with(|| vec![0; bucket_count]);

            let index = bucket_index(&day, days, now)?;
            match usize::try_from(index) {
                Ok(i) if i < bucket_count => series[i] = count,
                _ => debug!(day = %day, index = index, "Trend bucket outside window dropped"),
            }
        }

        Ok(trends)
    }
}

/// Bucket index for a `YYYY-MM-DD` day relative to `now`
fn bucket_index(day: &str, days: i64, now: DateTime<Utc>) -> Result<i64> {
    let day_start = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| ScanError::serialization(format!("invalid trend day {day:?}: {e}")))?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ScanError::serialization(format!("invalid trend day {day:?}")))?
        .and_utc();

    // Truncates toward zero, matching whole elapsed days
    let days_since = (now.signed_duration_since(day_start).num_seconds() as f64 / SECONDS_PER_DAY) as i64;
    Ok(days - days_since - 1)
}
