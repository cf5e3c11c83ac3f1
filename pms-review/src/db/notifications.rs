//! Notification persistence
//!
//! The table is unique on (sender, recipient, subject, quarter, kind);
//! [`upsert`] relies on that constraint so concurrent raises of the same key
//! converge on one row.

use chrono::{DateTime, Utc};
use pms_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;
use crate::models::{Notification, NotificationKey, NotificationKind, NotificationView};

const NOTIFICATION_COLUMNS: &str =
    "id, sender_id, recipient_id, subject_id, quarter, kind, is_read, created_at, updated_at";

/// Create the notification for `key`, or mark the existing one unread and refresh it
pub async fn upsert(
    pool: &SqlitePool,
    key: &NotificationKey,
    now: DateTime<Utc>,
) -> Result<Notification> {
    let now = time::to_db(now);
    let sql = format!(
        r#"
        INSERT INTO notifications (
            id, sender_id, recipient_id, subject_id, quarter, kind, is_read, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
        ON CONFLICT(sender_id, recipient_id, subject_id, quarter, kind) DO UPDATE SET
            is_read = 0,
            updated_at = excluded.updated_at
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    );

    let row = sqlx::query(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(key.sender_id.to_string())
        .bind(key.recipient_id.to_string())
        .bind(key.subject_id.to_string())
        .bind(&key.quarter)
        .bind(key.kind.as_str())
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await?;

    notification_from_row(&row)
}

/// Look up the live notification for `key`
pub async fn find(pool: &SqlitePool, key: &NotificationKey) -> Result<Option<Notification>> {
    let sql = format!(
        r#"
        SELECT {NOTIFICATION_COLUMNS} FROM notifications
        WHERE sender_id = ? AND recipient_id = ? AND subject_id = ? AND quarter = ? AND kind = ?
        "#
    );

    let row = sqlx::query(&sql)
        .bind(key.sender_id.to_string())
        .bind(key.recipient_id.to_string())
        .bind(key.subject_id.to_string())
        .bind(&key.quarter)
        .bind(key.kind.as_str())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(notification_from_row).transpose()
}

/// Delete the notification for `key`; returns rows removed (0 or 1)
pub async fn delete_by_key(pool: &SqlitePool, key: &NotificationKey) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM notifications
        WHERE sender_id = ? AND recipient_id = ? AND subject_id = ? AND quarter = ? AND kind = ?
        "#,
    )
    .bind(key.sender_id.to_string())
    .bind(key.recipient_id.to_string())
    .bind(key.subject_id.to_string())
    .bind(&key.quarter)
    .bind(key.kind.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete every notification of `kind` about (subject, quarter), regardless of sender
///
/// With `recipient_id` only that recipient's items are removed.
pub async fn delete_by_subject(
    pool: &SqlitePool,
    recipient_id: Option<Uuid>,
    subject_id: Uuid,
    quarter: &str,
    kind: NotificationKind,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM notifications
        WHERE subject_id = ? AND quarter = ? AND kind = ?
          AND (? IS NULL OR recipient_id = ?)
        "#,
    )
    .bind(subject_id.to_string())
    .bind(quarter)
    .bind(kind.as_str())
    .bind(recipient_id.map(|r| r.to_string()))
    .bind(recipient_id.map(|r| r.to_string()))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// All notifications addressed to `recipient_id`, most recently raised first
pub async fn list_for_recipient(
    pool: &SqlitePool,
    recipient_id: Uuid,
) -> Result<Vec<NotificationView>> {
    let rows = sqlx::query(
        r#"
        SELECT n.id, n.sender_id, n.recipient_id, n.subject_id, n.quarter, n.kind,
               n.is_read, n.created_at, n.updated_at,
               u.name AS sender_name,
               p.cycle AS cycle
        FROM notifications n
        LEFT JOIN users u ON u.id = n.sender_id
        LEFT JOIN performance_records p ON p.id = n.subject_id
        WHERE n.recipient_id = ?
        ORDER BY n.updated_at DESC, n.created_at DESC
        "#,
    )
    .bind(recipient_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(NotificationView {
                notification: notification_from_row(row)?,
                sender_name: row.get("sender_name"),
                cycle: row.get("cycle"),
            })
        })
        .collect()
}

/// Mark one notification read; only its recipient may do so
pub async fn mark_read(pool: &SqlitePool, id: Uuid, recipient_id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND recipient_id = ?")
        .bind(id.to_string())
        .bind(recipient_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark every notification of `recipient_id` read; returns rows changed
pub async fn mark_all_read(pool: &SqlitePool, recipient_id: Uuid) -> Result<u64> {
    let result =
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE recipient_id = ? AND is_read = 0")
            .bind(recipient_id.to_string())
            .execute(pool)
            .await?;

    Ok(result.rows_affected())
}

pub async fn unread_count(pool: &SqlitePool, recipient_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND is_read = 0",
    )
    .bind(recipient_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification> {
    let id: String = row.get("id");
    let sender_id: String = row.get("sender_id");
    let recipient_id: String = row.get("recipient_id");
    let subject_id: String = row.get("subject_id");
    let kind: String = row.get("kind");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Notification {
        id: parse_uuid(&id)?,
        sender_id: parse_uuid(&sender_id)?,
        recipient_id: parse_uuid(&recipient_id)?,
        subject_id: parse_uuid(&subject_id)?,
        quarter: row.get("quarter"),
        kind: kind.parse().map_err(Error::Internal)?,
        is_read: row.get("is_read"),
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pms_common::db::init_memory_database;

    fn key(kind: NotificationKind) -> NotificationKey {
        NotificationKey::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Q1",
            kind,
        )
    }

    #[tokio::test]
    async fn test_upsert_refreshes_existing_row() {
        let pool = init_memory_database().await.unwrap();
        let key = key(NotificationKind::Agreement);
        let t0 = time::now();

        let first = upsert(&pool, &key, t0).await.unwrap();
        assert!(mark_read(&pool, first.id, key.recipient_id).await.unwrap());

        let second = upsert(&pool, &key, t0 + Duration::seconds(5)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(!second.is_read);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(unread_count(&pool, key.recipient_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_key_is_exact() {
        let pool = init_memory_database().await.unwrap();
        let key = key(NotificationKind::Assessment);
        upsert(&pool, &key, time::now()).await.unwrap();

        let other_kind = NotificationKey {
            kind: NotificationKind::ResolveAssessment,
            ..key.clone()
        };
        assert_eq!(delete_by_key(&pool, &other_kind).await.unwrap(), 0);
        assert_eq!(delete_by_key(&pool, &key).await.unwrap(), 1);
        assert!(find(&pool, &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_subject_ignores_sender() {
        let pool = init_memory_database().await.unwrap();
        let a = key(NotificationKind::Agreement);
        let b = NotificationKey {
            sender_id: Uuid::new_v4(),
            ..a.clone()
        };
        upsert(&pool, &a, time::now()).await.unwrap();
        upsert(&pool, &b, time::now()).await.unwrap();

        let removed = delete_by_subject(&pool, None, a.subject_id, "Q1", NotificationKind::Agreement)
            .await
            .unwrap();
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_mark_read_requires_recipient() {
        let pool = init_memory_database().await.unwrap();
        let key = key(NotificationKind::Agreement);
        let n = upsert(&pool, &key, time::now()).await.unwrap();

        assert!(!mark_read(&pool, n.id, Uuid::new_v4()).await.unwrap());
        assert_eq!(mark_all_read(&pool, key.recipient_id).await.unwrap(), 1);
        assert_eq!(unread_count(&pool, key.recipient_id).await.unwrap(), 0);
    }
}
