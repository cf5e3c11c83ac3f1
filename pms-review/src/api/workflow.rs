//! Workflow operation endpoints
//!
//! `POST /workflow/{action}` or `POST /workflow` with `action` in the body.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{ReviewAction, SubWorkflow};
use crate::services::WorkflowRequest;
use crate::AppState;

/// Request body shared by every action
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowActionBody {
    pub action: Option<String>,
    pub performance_id: Option<Uuid>,
    pub quarter: Option<String>,
    pub kind: Option<SubWorkflow>,
    pub recipient_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub message: Option<String>,
}

impl WorkflowActionBody {
    fn into_parts(self, action: Option<String>) -> ApiResult<(WorkflowRequest, ReviewAction)> {
        let action = action
            .or(self.action)
            .ok_or_else(|| missing("action"))?;
        let performance_id = self.performance_id.ok_or_else(|| missing("performanceId"))?;
        let quarter = self
            .quarter
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| missing("quarter"))?;
        let workflow = self.kind.ok_or_else(|| missing("kind"))?;
        let actor_id = self.actor_id.ok_or_else(|| missing("actorId"))?;

        let action = ReviewAction::parse(&action, self.message)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok((
            WorkflowRequest {
                performance_id,
                quarter,
                workflow,
                actor_id,
                recipient_id: self.recipient_id,
            },
            action,
        ))
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::BadRequest(format!("missing required field '{}'", field))
}

/// POST /workflow/:action
pub async fn run_named_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
    body: Result<Json<WorkflowActionBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    run(&state, body, Some(action)).await
}

/// POST /workflow
pub async fn run_action(
    State(state): State<AppState>,
    body: Result<Json<WorkflowActionBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    run(&state, body, None).await
}

async fn run(
    state: &AppState,
    body: WorkflowActionBody,
    action: Option<String>,
) -> ApiResult<Json<Value>> {
    let (request, action) = body.into_parts(action)?;
    state.engine.execute(&request, action).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Build workflow routes
pub fn workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/workflow", post(run_action))
        .route("/workflow/:action", post(run_named_action))
}
