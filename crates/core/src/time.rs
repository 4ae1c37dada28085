use chrono::DateTime;

use crate::error::{MltraceError, Result};

/// Parses a raw timestamp field into microseconds.
///
/// Bare numbers are taken as microseconds verbatim; RFC3339 datetimes are
/// converted to microseconds since the Unix epoch. Everything else is a
/// per-record parse failure for the caller to account for.
pub fn parse_timestamp_us(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MltraceError::InvalidArgument(
            "empty timestamp field".to_string(),
        ));
    }

    if let Ok(us) = trimmed.parse::<i64>() {
        return Ok(us);
    }
    if let Ok(us) = trimmed.parse::<f64>() {
        if us.is_finite() {
            return Ok(us as i64);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.timestamp_micros());
    }

    Err(MltraceError::InvalidArgument(format!(
        "expected microseconds or RFC3339 time, got {trimmed:?}"
    )))
}
