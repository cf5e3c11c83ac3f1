//! Database fixtures

use anyhow::Result;
use chrono::{DateTime, Utc};
use pms_common::db::init_memory_database;
use pms_review::db::{performance, users};
use pms_review::models::{PerformanceRecord, SubWorkflow, User};
use pms_review::services::{SideChannelGateway, SweeperConfig, WorkflowRequest};
use pms_review::AppState;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use super::RecordingGateway;

pub const TENANT: &str = "tenant-1";
pub const CYCLE: i64 = 2026;

/// Owner Alice, supervisor Bob, committee member Carol, one record
pub struct TestWorld {
    pub state: AppState,
    pub gateway: Arc<RecordingGateway>,
    pub alice: User,
    pub bob: User,
    pub carol: User,
    pub record: PerformanceRecord,
}

impl TestWorld {
    pub fn db(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Request on Q1 of the world's record
    pub fn request(&self, workflow: SubWorkflow, actor: &User) -> WorkflowRequest {
        self.request_for("Q1", workflow, actor)
    }

    pub fn request_for(&self, quarter: &str, workflow: SubWorkflow, actor: &User) -> WorkflowRequest {
        WorkflowRequest {
            performance_id: self.record.id,
            quarter: quarter.to_string(),
            workflow,
            actor_id: actor.id,
            recipient_id: None,
        }
    }
}

pub async fn setup_world() -> Result<TestWorld> {
    let gateway = Arc::new(RecordingGateway::new());
    setup_world_with_gateway(gateway).await
}

pub async fn setup_world_with_gateway(gateway: Arc<RecordingGateway>) -> Result<TestWorld> {
    let pool = init_memory_database().await?;

    let alice = seed_user(&pool, "Alice", Some("alice@example.com")).await?;
    let bob = seed_user(&pool, "Bob", Some("bob@example.com")).await?;
    let carol = seed_user(&pool, "Carol", Some("carol@example.com")).await?;

    let record = performance::get_or_create_record(&pool, alice.id, CYCLE, Some(bob.id)).await?;

    let dyn_gateway: Arc<dyn SideChannelGateway> = gateway.clone();
    let state = AppState::new(pool, dyn_gateway, "no-reply@pms.local", SweeperConfig::default());

    Ok(TestWorld {
        state,
        gateway,
        alice,
        bob,
        carol,
        record,
    })
}

pub async fn seed_user(pool: &SqlitePool, name: &str, email: Option<&str>) -> Result<User> {
    let user = User {
        id: Uuid::new_v4(),
        tenant_id: TENANT.to_string(),
        name: name.to_string(),
        email: email.map(str::to_string),
    };
    users::save_user(pool, &user).await?;
    Ok(user)
}

/// Create a team with the given (user, role) members
pub async fn seed_team(pool: &SqlitePool, name: &str, members: &[(&User, &str)]) -> Result<Uuid> {
    let team_id = Uuid::new_v4();
    sqlx::query("INSERT INTO teams (id, tenant_id, name) VALUES (?, ?, ?)")
        .bind(team_id.to_string())
        .bind(TENANT)
        .bind(name)
        .execute(pool)
        .await?;

    for (user, role) in members {
        sqlx::query("INSERT INTO team_members (team_id, user_id, role) VALUES (?, ?, ?)")
            .bind(team_id.to_string())
            .bind(user.id.to_string())
            .bind(*role)
            .execute(pool)
            .await?;
    }

    Ok(team_id)
}

pub async fn seed_feedback_request(
    pool: &SqlitePool,
    requester: &User,
    respondent: &User,
    subject: &User,
    status: &str,
    due_at: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO feedback_requests
            (id, tenant_id, requester_id, respondent_id, subject_user_id, description, status, due_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(TENANT)
    .bind(requester.id.to_string())
    .bind(respondent.id.to_string())
    .bind(subject.id.to_string())
    .bind("Quarterly peer feedback")
    .bind(status)
    .bind(pms_common::time::to_db(due_at))
    .bind(pms_common::time::to_db(Utc::now()))
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn seed_obligation(
    pool: &SqlitePool,
    team_id: Uuid,
    title: &str,
    status: &str,
    due_at: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO compliance_obligations (id, tenant_id, team_id, title, status, due_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(TENANT)
    .bind(team_id.to_string())
    .bind(title)
    .bind(status)
    .bind(pms_common::time::to_db(due_at))
    .bind(pms_common::time::to_db(Utc::now()))
    .execute(pool)
    .await?;

    Ok(id)
}
