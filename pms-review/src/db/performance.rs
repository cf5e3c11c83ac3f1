//! Performance record and quarterly target persistence
//!
//! Each sub-workflow occupies its own column group on `quarterly_targets`,
//! named `{agreement|assessment}_*`. State changes go through
//! [`compare_and_swap_state`], which only writes when the stored group
//! still matches the state the caller read.

use pms_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_optional_uuid, parse_uuid};
use crate::models::{
    PerformanceRecord, QuarterlyTarget, ReviewState, StoredReviewColumns, SubWorkflow, TargetRef,
    DEFAULT_QUARTERS,
};

/// Load the record for (user, cycle), creating it with default quarters if absent
///
/// `supervisor_id` is only applied to newly created quarters.
pub async fn get_or_create_record(
    pool: &SqlitePool,
    user_id: Uuid,
    cycle: i64,
    supervisor_id: Option<Uuid>,
) -> Result<PerformanceRecord> {
    let now = time::to_db(time::now());

    sqlx::query(
        r#"
        INSERT INTO performance_records (id, user_id, cycle, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id, cycle) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id.to_string())
    .bind(cycle)
    .bind(&now)
    .execute(pool)
    .await?;

    let id: String =
        sqlx::query_scalar("SELECT id FROM performance_records WHERE user_id = ? AND cycle = ?")
            .bind(user_id.to_string())
            .bind(cycle)
            .fetch_one(pool)
            .await?;

    for (position, quarter) in DEFAULT_QUARTERS.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO quarterly_targets (performance_id, quarter, position, supervisor_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(performance_id, quarter) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(*quarter)
        .bind(position as i64)
        .bind(supervisor_id.map(|s| s.to_string()))
        .execute(pool)
        .await?;
    }

    let id = parse_uuid(&id)?;
    load_record(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("performance record {}", id)))
}

/// Load a record with all of its quarterly targets
pub async fn load_record(pool: &SqlitePool, id: Uuid) -> Result<Option<PerformanceRecord>> {
    let row = sqlx::query("SELECT id, user_id, cycle, created_at FROM performance_records WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let user_id: String = row.get("user_id");
    let created_at: String = row.get("created_at");

    let target_rows = sqlx::query(
        "SELECT * FROM quarterly_targets WHERE performance_id = ? ORDER BY position",
    )
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;

    let targets = target_rows
        .iter()
        .map(target_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(PerformanceRecord {
        id,
        user_id: parse_uuid(&user_id)?,
        cycle: row.get("cycle"),
        created_at: time::from_db(&created_at)?,
        targets,
    }))
}

/// Load one quarterly target
pub async fn load_target(
    pool: &SqlitePool,
    performance_id: Uuid,
    quarter: &str,
) -> Result<Option<QuarterlyTarget>> {
    let row = sqlx::query("SELECT * FROM quarterly_targets WHERE performance_id = ? AND quarter = ?")
        .bind(performance_id.to_string())
        .bind(quarter)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(target_from_row).transpose()
}

/// Assign the default approver of a quarter
pub async fn set_supervisor(
    pool: &SqlitePool,
    performance_id: Uuid,
    quarter: &str,
    supervisor_id: Option<Uuid>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE quarterly_targets SET supervisor_id = ? WHERE performance_id = ? AND quarter = ?",
    )
    .bind(supervisor_id.map(|s| s.to_string()))
    .bind(performance_id.to_string())
    .bind(quarter)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "quarter {} of record {}",
            quarter, performance_id
        )));
    }

    Ok(())
}

/// Write `next` only if the stored group still matches `expected`
///
/// Returns `false` when another writer changed the group first; nothing is
/// written in that case.
pub async fn compare_and_swap_state(
    pool: &SqlitePool,
    target: &TargetRef,
    expected: &ReviewState,
    next: &ReviewState,
) -> Result<bool> {
    let p = target.workflow.as_str();
    let old = expected.to_columns();
    let new = next.to_columns();

    let sql = format!(
        r#"
        UPDATE quarterly_targets SET
            {p}_status = ?,
            {p}_review_status = ?,
            is_{p}_committee_send_back = ?,
            {p}_committee_send_back_message = ?,
            {p}_send_back_message = ?,
            {p}_updated_at = ?
        WHERE performance_id = ?
          AND quarter = ?
          AND {p}_status = ?
          AND {p}_review_status = ?
          AND is_{p}_committee_send_back = ?
        "#
    );

    let result = sqlx::query(&sql)
        .bind(new.status.as_str())
        .bind(new.review_status.as_str())
        .bind(new.committee_send_back)
        .bind(&new.committee_message)
        .bind(&new.send_back_message)
        .bind(time::to_db(time::now()))
        .bind(target.performance_id.to_string())
        .bind(&target.quarter)
        .bind(old.status.as_str())
        .bind(old.review_status.as_str())
        .bind(old.committee_send_back)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

fn target_from_row(row: &SqliteRow) -> Result<QuarterlyTarget> {
    let performance_id: String = row.get("performance_id");
    let supervisor_id: Option<String> = row.get("supervisor_id");

    Ok(QuarterlyTarget {
        performance_id: parse_uuid(&performance_id)?,
        quarter: row.get("quarter"),
        position: row.get("position"),
        supervisor_id: parse_optional_uuid(supervisor_id)?,
        agreement: state_from_row(row, SubWorkflow::Agreement)?,
        assessment: state_from_row(row, SubWorkflow::Assessment)?,
    })
}

fn state_from_row(row: &SqliteRow, workflow: SubWorkflow) -> Result<ReviewState> {
    let p = workflow.as_str();
    let status: String = row.try_get(format!("{p}_status").as_str())?;
    let review_status: String = row.try_get(format!("{p}_review_status").as_str())?;

    let columns = StoredReviewColumns {
        status: status.parse().map_err(Error::Internal)?,
        review_status: review_status.parse().map_err(Error::Internal)?,
        committee_send_back: row.try_get(format!("is_{p}_committee_send_back").as_str())?,
        committee_message: row.try_get(format!("{p}_committee_send_back_message").as_str())?,
        send_back_message: row.try_get(format!("{p}_send_back_message").as_str())?,
    };

    ReviewState::from_columns(columns)
        .map_err(|e| Error::Internal(format!("Stored {} state is illegal: {}", p, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::save_user;
    use crate::models::{ReviewAction, User};
    use pms_common::db::init_memory_database;

    async fn setup() -> (SqlitePool, Uuid) {
        let pool = init_memory_database().await.unwrap();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            name: "Alice".to_string(),
            email: Some("alice@example.com".to_string()),
        };
        save_user(&pool, &user).await.unwrap();
        (pool, user.id)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (pool, user_id) = setup().await;

        let first = get_or_create_record(&pool, user_id, 2026, None).await.unwrap();
        let second = get_or_create_record(&pool, user_id, 2026, None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.targets.len(), DEFAULT_QUARTERS.len());
        assert_eq!(second.targets[0].quarter, "Q1");
        assert_eq!(second.targets[0].agreement, ReviewState::default());
    }

    #[tokio::test]
    async fn test_cas_writes_when_state_matches() {
        let (pool, user_id) = setup().await;
        let record = get_or_create_record(&pool, user_id, 2026, None).await.unwrap();
        let target = TargetRef::new(record.id, "Q2", SubWorkflow::Assessment);

        let draft = ReviewState::default();
        let submitted = draft.apply(&ReviewAction::Submit).unwrap();

        assert!(compare_and_swap_state(&pool, &target, &draft, &submitted).await.unwrap());

        let stored = load_target(&pool, record.id, "Q2").await.unwrap().unwrap();
        assert_eq!(stored.assessment, submitted);
        assert_eq!(stored.agreement, draft);
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_expectation() {
        let (pool, user_id) = setup().await;
        let record = get_or_create_record(&pool, user_id, 2026, None).await.unwrap();
        let target = TargetRef::new(record.id, "Q1", SubWorkflow::Agreement);

        let draft = ReviewState::default();
        let submitted = draft.apply(&ReviewAction::Submit).unwrap();
        let approved = submitted.apply(&ReviewAction::Approve).unwrap();

        // Given: the row moved to Submitted
        assert!(compare_and_swap_state(&pool, &target, &draft, &submitted).await.unwrap());

        // When: a writer still holding Draft tries to write
        let written = compare_and_swap_state(&pool, &target, &draft, &approved).await.unwrap();

        // Then: nothing changes
        assert!(!written);
        let stored = load_target(&pool, record.id, "Q1").await.unwrap().unwrap();
        assert_eq!(stored.agreement, submitted);
    }

    #[tokio::test]
    async fn test_set_supervisor_unknown_quarter() {
        let (pool, user_id) = setup().await;
        let record = get_or_create_record(&pool, user_id, 2026, None).await.unwrap();

        let err = set_supervisor(&pool, record.id, "Q9", Some(user_id)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
