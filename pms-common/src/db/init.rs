//! Database initialization
//!
//! Opens (or creates) the SQLite database and applies the schema. Every
//! statement is `CREATE … IF NOT EXISTS`, so initialization is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open the database file, creating it and its parent directory if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets request handlers read while the sweeper or a transition writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Limited to one connection: every SQLite `:memory:` connection is a
/// separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;
    create_performance_tables(pool).await?;
    create_notifications_table(pool).await?;
    create_team_tables(pool).await?;
    create_feedback_requests_table(pool).await?;
    create_compliance_obligations_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Performance records and their embedded quarterly targets
///
/// Each sub-workflow (agreement, assessment) has the same column group.
async fn create_performance_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS performance_records (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            cycle INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, cycle)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quarterly_targets (
            performance_id TEXT NOT NULL REFERENCES performance_records(id) ON DELETE CASCADE,
            quarter TEXT NOT NULL,
            position INTEGER NOT NULL,
            supervisor_id TEXT,
            agreement_status TEXT NOT NULL DEFAULT 'Draft',
            agreement_review_status TEXT NOT NULL DEFAULT 'NotReviewed',
            is_agreement_committee_send_back INTEGER NOT NULL DEFAULT 0,
            agreement_committee_send_back_message TEXT,
            agreement_send_back_message TEXT,
            agreement_updated_at TEXT,
            assessment_status TEXT NOT NULL DEFAULT 'Draft',
            assessment_review_status TEXT NOT NULL DEFAULT 'NotReviewed',
            is_assessment_committee_send_back INTEGER NOT NULL DEFAULT 0,
            assessment_committee_send_back_message TEXT,
            assessment_send_back_message TEXT,
            assessment_updated_at TEXT,
            PRIMARY KEY (performance_id, quarter)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One live row per (sender, recipient, subject, quarter, kind)
async fn create_notifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            sender_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            quarter TEXT NOT NULL,
            kind TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (sender_id, recipient_id, subject_id, quarter, kind)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_team_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_members (
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role TEXT NOT NULL DEFAULT 'member',
            PRIMARY KEY (team_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_feedback_requests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback_requests (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            requester_id TEXT NOT NULL,
            respondent_id TEXT NOT NULL,
            subject_user_id TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'pending',
            due_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_feedback_requests_due ON feedback_requests(status, due_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_compliance_obligations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS compliance_obligations (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            due_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_compliance_obligations_due ON compliance_obligations(status, due_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
