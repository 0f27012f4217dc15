//! Conversions between stored column text and domain values

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::ScanError;

/// Format a timestamp for storage.
///
/// Fixed-width UTC with microseconds, so text order matches time order.
pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn parse_db_timestamp(raw: &str) -> Result<DateTime<Utc>, ScanError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ScanError::serialization(format!("invalid stored timestamp {raw:?}: {e}")))
}

/// Parse an aggregated risk-factor column.
///
/// Accepts a JSON array (`["RCE","High CVSS"]`) or a brace-delimited array
/// literal (`{RCE,"High CVSS"}`). Null elements are dropped.
pub fn parse_risk_factors(raw: &str) -> Result<Vec<String>, ScanError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let values: Vec<Option<String>> = serde_json::from_str(trimmed)
            .map_err(|e| ScanError::serialization(format!("failed to parse risk factors: {e}")))?;
        return Ok(values.into_iter().flatten().collect());
    }

    if let Some(inner) = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        return parse_array_literal(inner);
    }

    Err(ScanError::serialization(format!(
        "failed to parse risk factors: unrecognized encoding {raw:?}"
    )))
}

fn parse_array_literal(inner: &str) -> Result<Vec<String>, ScanError> {
    let mut factors = Vec::new();
    if inner.trim().is_empty() {
        return Ok(factors);
    }

    let mut current = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                was_quoted = true;
            }
            '\\' if quoted => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => {
                    return Err(ScanError::serialization(
                        "failed to parse risk factors: dangling escape",
                    ));
                }
            },
            ',' if !quoted => {
                push_element(&mut factors, &current, was_quoted);
                current.clear();
                was_quoted = false;
            }
            _ => current.push(c),
        }
    }

    if quoted {
        return Err(ScanError::serialization(
            "failed to parse risk factors: unterminated quote",
        ));
    }
    push_element(&mut factors, &current, was_quoted);

    Ok(factors)
}

fn push_element(factors: &mut Vec<String>, element: &str, was_quoted: bool) {
    if was_quoted {
        factors.push(element.to_string());
        return;
    }
    let element = element.trim();
    if !element.eq_ignore_ascii_case("NULL") {
        factors.push(element.to_string());
    }
}
