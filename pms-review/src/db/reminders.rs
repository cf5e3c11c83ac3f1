//! Queries feeding the reminder sweep
//!
//! Items are selected by status and by a due-date range. `due_at` is
//! stored as fixed-width RFC 3339 text, so the range compares as text. A
//! row that cannot be decoded is logged and left out of the batch.

use chrono::{DateTime, Utc};
use pms_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use super::parse_uuid;
use crate::models::{PendingFeedback, PendingObligation, TeamLead};

/// Pending feedback requests due in `[from, to]`, with the respondent's address
pub async fn pending_feedback(
    pool: &SqlitePool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<PendingFeedback>> {
    let rows = sqlx::query(
        r#"
        SELECT f.id, f.tenant_id, f.respondent_id, f.description, f.due_at,
               r.email AS respondent_email,
               s.name AS subject_name
        FROM feedback_requests f
        LEFT JOIN users r ON r.id = f.respondent_id
        LEFT JOIN users s ON s.id = f.subject_user_id
        WHERE f.status = 'pending' AND f.due_at BETWEEN ? AND ?
        ORDER BY f.due_at
        "#,
    )
    .bind(time::to_db(from))
    .bind(time::to_db(to))
    .fetch_all(pool)
    .await?;

    Ok(decode_rows(&rows, "feedback request", feedback_from_row))
}

fn feedback_from_row(row: &SqliteRow) -> Result<PendingFeedback> {
    let id: String = row.get("id");
    let respondent_id: String = row.get("respondent_id");
    let due_at: String = row.get("due_at");
    Ok(PendingFeedback {
        id: parse_uuid(&id)?,
        tenant_id: row.get("tenant_id"),
        respondent_id: parse_uuid(&respondent_id)?,
        respondent_email: row.get("respondent_email"),
        subject_name: row.get("subject_name"),
        description: row.get("description"),
        due_at: time::from_db(&due_at)?,
    })
}

/// Pending compliance obligations due in `[from, to]`
pub async fn pending_obligations(
    pool: &SqlitePool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<PendingObligation>> {
    let rows = sqlx::query(
        r#"
        SELECT id, tenant_id, team_id, title, due_at
        FROM compliance_obligations
        WHERE status = 'pending' AND due_at BETWEEN ? AND ?
        ORDER BY due_at, title
        "#,
    )
    .bind(time::to_db(from))
    .bind(time::to_db(to))
    .fetch_all(pool)
    .await?;

    Ok(decode_rows(&rows, "compliance obligation", obligation_from_row))
}

fn obligation_from_row(row: &SqliteRow) -> Result<PendingObligation> {
    let id: String = row.get("id");
    let team_id: String = row.get("team_id");
    let due_at: String = row.get("due_at");
    Ok(PendingObligation {
        id: parse_uuid(&id)?,
        tenant_id: row.get("tenant_id"),
        team_id: parse_uuid(&team_id)?,
        title: row.get("title"),
        due_at: time::from_db(&due_at)?,
    })
}

fn decode_rows<T>(
    rows: &[SqliteRow],
    what: &str,
    decode: impl Fn(&SqliteRow) -> Result<T>,
) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match decode(row) {
            Ok(item) => Some(item),
            Err(e) => {
                let id: String = row.try_get("id").unwrap_or_default();
                warn!("Skipping unreadable {} {}: {}", what, id, e);
                None
            }
        })
        .collect()
}

/// Members of `team_id` holding the lead role
pub async fn team_leads(pool: &SqlitePool, team_id: Uuid) -> Result<Vec<TeamLead>> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.name, u.email
        FROM team_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.team_id = ? AND m.role = 'lead'
        ORDER BY u.name
        "#,
    )
    .bind(team_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.get("id");
            Ok(TeamLead {
                user_id: parse_uuid(&id)?,
                name: row.get("name"),
                email: row.get("email"),
            })
        })
        .collect()
}
