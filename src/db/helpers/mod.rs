use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

const SQLITE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a stored timestamp. Rows written by this crate carry RFC 3339;
/// tables created with `DEFAULT CURRENT_TIMESTAMP` carry SQLite's bare
/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, SQLITE_DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .with_context(|| format!("failed to parse {field}"))
}

pub fn epoch_millis(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}
