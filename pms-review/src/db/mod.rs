//! Database operations for the review service
//!
//! Free functions over a `SqlitePool`. Identifiers are stored as hyphenated
//! UUID text and timestamps as RFC 3339 text.

pub mod notifications;
pub mod performance;
pub mod reminders;
pub mod sessions;
pub mod users;

use pms_common::{Error, Result};
use uuid::Uuid;

/// Parse a stored UUID column
pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid UUID '{}' in database: {}", value, e)))
}

/// Parse an optional stored UUID column
pub(crate) fn parse_optional_uuid(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(parse_uuid).transpose()
}
