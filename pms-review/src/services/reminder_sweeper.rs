//! Deadline reminder sweep
//!
//! Two variants run in every sweep:
//! - feedback: one email per pending request, to its respondent
//! - compliance: pending obligations grouped by team, one email per team
//!   lead listing all of the team's items
//!
//! No "already reminded" marker is kept. Each item in its window is
//! reminded on every sweep, so the sweep interval (daily by default) is
//! what bounds repeats.

use chrono::{DateTime, Duration, Utc};
use pms_common::config::ReminderConfig;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::messages;
use super::side_channel::BestEffortMailer;
use crate::db::reminders;
use crate::error::WorkflowError;
use crate::models::{PendingObligation, ReminderWindow, SweepReport};

/// Sweep schedule and window
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// How long before a deadline reminders start
    pub grace: Duration,
    pub interval: std::time::Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self::from(&ReminderConfig::default())
    }
}

impl From<&ReminderConfig> for SweeperConfig {
    fn from(config: &ReminderConfig) -> Self {
        Self {
            enabled: config.enabled,
            grace: Duration::days(config.grace_days),
            interval: std::time::Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }
}

/// Periodic reminder sender
#[derive(Debug)]
pub struct ReminderSweeper {
    db: SqlitePool,
    mailer: BestEffortMailer,
    config: SweeperConfig,
}

impl ReminderSweeper {
    pub fn new(db: SqlitePool, mailer: BestEffortMailer, config: SweeperConfig) -> Self {
        Self { db, mailer, config }
    }

    fn window(&self, due_at: DateTime<Utc>) -> ReminderWindow {
        ReminderWindow::new(due_at, self.config.grace)
    }

    /// Due dates whose reminder window contains `now`
    fn due_range(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now, now + self.config.grace)
    }

    /// Run both reminder variants once
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport, WorkflowError> {
        let mut report = self.sweep_feedback(now).await?;
        report.merge(self.sweep_compliance(now).await?);

        info!(
            items_considered = report.items_considered,
            reminders_sent = report.reminders_sent,
            reminders_failed = report.reminders_failed,
            reminders_skipped = report.reminders_skipped,
            "Reminder sweep complete"
        );

        Ok(report)
    }

    async fn sweep_feedback(&self, now: DateTime<Utc>) -> Result<SweepReport, WorkflowError> {
        let mut report = SweepReport::default();

        let (from, to) = self.due_range(now);
        for request in reminders::pending_feedback(&self.db, from, to).await? {
            // Rows not written in the canonical format may compare differently as text
            if !self.window(request.due_at).contains(now) {
                continue;
            }
            report.items_considered += 1;

            let Some(email) = request.respondent_email.as_deref() else {
                debug!(
                    feedback_id = %request.id,
                    respondent_id = %request.respondent_id,
                    "Respondent has no email address, skipping reminder"
                );
                report.reminders_skipped += 1;
                continue;
            };

            let content = messages::feedback_reminder(
                request.subject_name.as_deref(),
                &request.description,
                request.due_at,
            );
            if self.mailer.deliver(&request.tenant_id, Some(email), content).await {
                report.reminders_sent += 1;
            } else {
                report.reminders_failed += 1;
            }
        }

        Ok(report)
    }

    async fn sweep_compliance(&self, now: DateTime<Utc>) -> Result<SweepReport, WorkflowError> {
        let mut report = SweepReport::default();
        let mut by_team: BTreeMap<Uuid, Vec<PendingObligation>> = BTreeMap::new();

        let (from, to) = self.due_range(now);
        for obligation in reminders::pending_obligations(&self.db, from, to).await? {
            if self.window(obligation.due_at).contains(now) {
                by_team.entry(obligation.team_id).or_default().push(obligation);
            }
        }

        for (team_id, items) in by_team {
            report.items_considered += items.len();

            let leads = reminders::team_leads(&self.db, team_id).await?;
            if leads.is_empty() {
                warn!(
                    team_id = %team_id,
                    items = items.len(),
                    "Team has pending compliance items but no lead to remind"
                );
                report.reminders_skipped += 1;
                continue;
            }

            let titles: Vec<&str> = items.iter().map(|o| o.title.as_str()).collect();
            let tenant_id = items[0].tenant_id.as_str();
            let due_at = items
                .iter()
                .map(|o| o.due_at)
                .min()
                .unwrap_or(now);

            for lead in leads {
                let Some(email) = lead.email.as_deref() else {
                    debug!(team_id = %team_id, lead_id = %lead.user_id, "Team lead has no email address");
                    report.reminders_skipped += 1;
                    continue;
                };

                let content = messages::compliance_reminder(&lead.name, &titles, due_at);
                if self.mailer.deliver(tenant_id, Some(email), content).await {
                    report.reminders_sent += 1;
                } else {
                    report.reminders_failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Spawn the periodic sweep loop
    pub fn run(self: Arc<Self>) {
        if !self.config.enabled {
            info!("ReminderSweeper disabled by configuration");
            return;
        }

        info!(
            "Starting ReminderSweeper (interval: {}s, grace: {}h)",
            self.config.interval.as_secs(),
            self.config.grace.num_hours()
        );

        tokio::spawn(async move {
            let mut timer = interval(self.config.interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                timer.tick().await;

                if let Err(e) = self.sweep_once(pms_common::time::now()).await {
                    error!("ReminderSweeper: sweep failed: {}", e);
                }
            }
        });
    }
}
