//! Notification listing and read-state endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::NotificationView;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientQuery {
    pub recipient_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub recipient_id: Uuid,
    pub count: i64,
}

/// GET /notifications?recipientId=
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<RecipientQuery>,
) -> ApiResult<Json<Vec<NotificationView>>> {
    let items = state
        .notifications
        .list_for_recipient(query.recipient_id)
        .await?;
    Ok(Json(items))
}

/// POST /notifications/:id/read?recipientId=
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<RecipientQuery>,
) -> ApiResult<Json<Value>> {
    state.notifications.mark_read(id, query.recipient_id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /notifications/read-all?recipientId=
pub async fn mark_all_read(
    State(state): State<AppState>,
    Query(query): Query<RecipientQuery>,
) -> ApiResult<Json<Value>> {
    let updated = state.notifications.mark_all_read(query.recipient_id).await?;
    Ok(Json(json!({ "ok": true, "updated": updated })))
}

/// GET /notifications/unread-count?recipientId=
pub async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<RecipientQuery>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let count = state.notifications.unread_count(query.recipient_id).await?;
    Ok(Json(UnreadCountResponse {
        recipient_id: query.recipient_id,
        count,
    }))
}

/// Build notification routes (the live stream is routed separately)
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/:id/read", post(mark_read))
}
