//! Deduplicated in-app notifications

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::db::notifications;
use crate::error::WorkflowError;
use crate::models::{Notification, NotificationKey, NotificationKind, NotificationView};

/// Keeps at most one live notification per key
#[derive(Debug, Clone)]
pub struct NotificationStore {
    db: SqlitePool,
}

impl NotificationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create or refresh the notification for `key`; it comes back unread
    pub async fn upsert(&self, key: &NotificationKey) -> Result<Notification, WorkflowError> {
        self.upsert_at(key, pms_common::time::now()).await
    }

    pub async fn upsert_at(
        &self,
        key: &NotificationKey,
        now: DateTime<Utc>,
    ) -> Result<Notification, WorkflowError> {
        let notification = notifications::upsert(&self.db, key, now).await?;
        debug!(
            notification_id = %notification.id,
            recipient_id = %key.recipient_id,
            kind = %key.kind,
            "Notification raised"
        );
        Ok(notification)
    }

    /// Delete the notification for `key`; idempotent
    pub async fn resolve(&self, key: &NotificationKey) -> Result<u64, WorkflowError> {
        let removed = notifications::delete_by_key(&self.db, key).await?;
        debug!(
            recipient_id = %key.recipient_id,
            kind = %key.kind,
            removed,
            "Notification resolved"
        );
        Ok(removed)
    }

    /// Delete every `kind` notification about (subject, quarter), optionally for one recipient
    pub async fn delete_by_subject(
        &self,
        recipient_id: Option<Uuid>,
        subject_id: Uuid,
        quarter: &str,
        kind: NotificationKind,
    ) -> Result<u64, WorkflowError> {
        Ok(notifications::delete_by_subject(&self.db, recipient_id, subject_id, quarter, kind).await?)
    }

    pub async fn find(&self, key: &NotificationKey) -> Result<Option<Notification>, WorkflowError> {
        Ok(notifications::find(&self.db, key).await?)
    }

    pub async fn list_for_recipient(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<NotificationView>, WorkflowError> {
        Ok(notifications::list_for_recipient(&self.db, recipient_id).await?)
    }

    /// Mark one notification read; NotFound unless it belongs to `recipient_id`
    pub async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<(), WorkflowError> {
        if notifications::mark_read(&self.db, id, recipient_id).await? {
            Ok(())
        } else {
            Err(WorkflowError::NotFound(format!("notification {}", id)))
        }
    }

    pub async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, WorkflowError> {
        Ok(notifications::mark_all_read(&self.db, recipient_id).await?)
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64, WorkflowError> {
        Ok(notifications::unread_count(&self.db, recipient_id).await?)
    }
}
