//! Observation timestamps

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use vectis_core::{Error, Result};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse an RFC 3339 timestamp, or `YYYY-MM-DD HH:MM[:SS]` taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::invalid("timestamp", text, "expected RFC 3339 or YYYY-MM-DD HH:MM[:SS]"))
}

/// Hours from `start` to `end`.
///
/// Either timestamp missing is [`Error::MissingMetadata`]; a non-positive
/// interval is an invalid `end_time`.
pub(crate) fn elapsed_hours(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<f64> {
    let start = start.ok_or_else(|| Error::MissingMetadata("start time is not set".into()))?;
    let end = end.ok_or_else(|| Error::MissingMetadata("end time is not set".into()))?;
    let hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
    if hours <= 0.0 {
        return Err(Error::invalid("end_time", end, format!("must be after start time {}", start)));
    }
    Ok(hours)
}
