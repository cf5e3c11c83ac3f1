//! Reminder sweep models

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Interval ending at a deadline during which reminders are sent
///
/// Both ends are inclusive: `period_end - grace <= now <= period_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub period_end: DateTime<Utc>,
    pub grace: Duration,
}

impl ReminderWindow {
    pub fn new(period_end: DateTime<Utc>, grace: Duration) -> Self {
        Self { period_end, grace }
    }

    pub fn with_grace_days(period_end: DateTime<Utc>, grace_days: i64) -> Self {
        Self::new(period_end, Duration::days(grace_days))
    }

    pub fn opens_at(&self) -> DateTime<Utc> {
        self.period_end - self.grace
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.opens_at() <= now && now <= self.period_end
    }
}

/// Pending feedback request with its respondent's address
#[derive(Debug, Clone)]
pub struct PendingFeedback {
    pub id: Uuid,
    pub tenant_id: String,
    pub respondent_id: Uuid,
    pub respondent_email: Option<String>,
    pub subject_name: Option<String>,
    pub description: String,
    pub due_at: DateTime<Utc>,
}

/// Pending compliance obligation owned by a team
#[derive(Debug, Clone)]
pub struct PendingObligation {
    pub id: Uuid,
    pub tenant_id: String,
    pub team_id: Uuid,
    pub title: String,
    pub due_at: DateTime<Utc>,
}

/// Team lead reminded on behalf of a team
#[derive(Debug, Clone)]
pub struct TeamLead {
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

/// Outcome counters of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Pending items inside their reminder window
    pub items_considered: usize,
    pub reminders_sent: usize,
    pub reminders_failed: usize,
    /// Reminders not attempted: no address, or a team without a lead
    pub reminders_skipped: usize,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.items_considered += other.items_considered;
        self.reminders_sent += other.reminders_sent;
        self.reminders_failed += other.reminders_failed;
        self.reminders_skipped += other.reminders_skipped;
    }
}
