//! In-app notification items
//!
//! A notification is identified by the five-part [`NotificationKey`]. The
//! store keeps at most one live row per key; re-raising the same key
//! refreshes that row instead of adding another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// What the recipient is being asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Approve a submitted agreement
    Agreement,
    /// Approve a submitted assessment
    Assessment,
    /// Rework an agreement that was sent back
    ResolveAgreement,
    /// Rework an assessment that was sent back
    ResolveAssessment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Agreement => "agreement",
            NotificationKind::Assessment => "assessment",
            NotificationKind::ResolveAgreement => "resolve_agreement",
            NotificationKind::ResolveAssessment => "resolve_assessment",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agreement" => Ok(NotificationKind::Agreement),
            "assessment" => Ok(NotificationKind::Assessment),
            "resolve_agreement" => Ok(NotificationKind::ResolveAgreement),
            "resolve_assessment" => Ok(NotificationKind::ResolveAssessment),
            other => Err(format!("unknown notification kind '{}'", other)),
        }
    }
}

/// Deduplication key of a notification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationKey {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    /// Performance record the notification is about
    pub subject_id: Uuid,
    pub quarter: String,
    pub kind: NotificationKind,
}

impl NotificationKey {
    pub fn new(
        sender_id: Uuid,
        recipient_id: Uuid,
        subject_id: Uuid,
        quarter: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            sender_id,
            recipient_id,
            subject_id,
            quarter: quarter.into(),
            kind,
        }
    }
}

/// Stored notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject_id: Uuid,
    pub quarter: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notification enriched for display: sender name and review cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub sender_name: Option<String>,
    pub cycle: Option<i64>,
}
