//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 text and carried on live events as
//! milliseconds since the UNIX epoch.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time in milliseconds since the UNIX epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a timestamp for storage
///
/// Fixed width (microseconds, `Z` suffix) so stored text sorts chronologically.
pub fn to_db(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp
pub fn from_db(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}
