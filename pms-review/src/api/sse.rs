//! Live notification stream (SSE)

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
};
use pms_common::token::parse_bearer;
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::ChannelGuard;
use crate::AppState;

/// EventSource clients cannot set headers, so the token may come as `?token=`
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub token: Option<String>,
}

/// GET /notifications/stream
///
/// Opens one channel for the authenticated user. The channel is
/// unregistered when the client disconnects.
pub async fn notification_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> ApiResult<impl IntoResponse> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
        .map(str::to_string)
        .or(query.token)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let user_id = state
        .identity
        .resolve(&token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("unknown or expired token".to_string()))?;

    let (channel_id, rx) = state.registry.connect(user_id);
    let guard = ChannelGuard::new(state.registry.clone(), user_id, channel_id);

    info!(user_id = %user_id, channel_id, "Notification stream opened");

    Ok(pms_common::sse::channel_sse_stream(rx, guard))
}
