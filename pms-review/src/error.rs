//! Error types for pms-review

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::TransitionError;

/// Failure of a workflow operation
///
/// Side-channel (email) failures never appear here; they are logged by the
/// mailer and the operation still succeeds.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Illegal transition or malformed input; nothing was mutated
    #[error("{0}")]
    Validation(String),

    /// Record, target or user does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Stored state changed between read and conditional write
    #[error("{0}")]
    Conflict(String),

    /// Storage failure
    #[error("Repository error: {0}")]
    Repository(String),
}

impl From<TransitionError> for WorkflowError {
    fn from(err: TransitionError) -> Self {
        WorkflowError::Validation(err.to_string())
    }
}

impl From<pms_common::Error> for WorkflowError {
    fn from(err: pms_common::Error) -> Self {
        match err {
            pms_common::Error::NotFound(what) => WorkflowError::NotFound(what),
            other => WorkflowError::Repository(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        WorkflowError::Repository(err.to_string())
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or unknown credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict (409) - concurrent transition on the same target
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// pms-common error
    #[error("Common error: {0}")]
    Common(#[from] pms_common::Error),
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(msg) => ApiError::BadRequest(msg),
            WorkflowError::NotFound(what) => ApiError::NotFound(what),
            WorkflowError::Conflict(msg) => ApiError::Conflict(msg),
            WorkflowError::Repository(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience type for API results
pub type ApiResult<T> = Result<T, ApiError>;
