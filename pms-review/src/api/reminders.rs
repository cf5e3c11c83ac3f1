//! On-demand reminder sweep

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::models::SweepReport;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SweepQuery {
    /// Evaluate windows as of this instant instead of now
    pub at: Option<DateTime<Utc>>,
}

/// POST /reminders/sweep
pub async fn trigger_sweep(
    State(state): State<AppState>,
    Query(query): Query<SweepQuery>,
) -> ApiResult<Json<SweepReport>> {
    let now = query.at.unwrap_or_else(pms_common::time::now);
    let report = state.sweeper.sweep_once(now).await?;
    Ok(Json(report))
}

pub fn reminder_routes() -> Router<AppState> {
    Router::new().route("/reminders/sweep", post(trigger_sweep))
}
