// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::models::attempt::{AttemptAction, AttemptStatus};

pub type AppResult<T> = Result<T, AppError>;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request: malformed or invalid input, raised before any mutation
    Validation(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict: the (user, exam) pair is already assigned
    DuplicateAssignment { user_id: i64, exam_id: i64 },

    // 409 Conflict: the attempt state machine rejected the action
    InvalidTransition {
        attempt_id: i64,
        from: AttemptStatus,
        action: AttemptAction,
    },

    // 409 Conflict: unassign of an attempt that already left `assigned`
    AttemptInProgress { attempt_id: i64 },

    // 409 Conflict (e.g., duplicate username, exam still assigned)
    Conflict(String),
}

impl AppError {
    /// Stable machine-readable identifier sent alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "internal_error",
            AppError::Validation(_) => "validation_error",
            AppError::AuthError(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::DuplicateAssignment { .. } => "duplicate_assignment",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::AttemptInProgress { .. } => "attempt_in_progress",
            AppError::Conflict(_) => "conflict",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateAssignment { .. }
            | AppError::InvalidTransition { .. }
            | AppError::AttemptInProgress { .. }
            | AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg)
            | AppError::Validation(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => f.write_str(msg),
            AppError::DuplicateAssignment { user_id, exam_id } => write!(
                f,
                "Exam {} is already assigned to user {}",
                exam_id, user_id
            ),
            AppError::InvalidTransition {
                attempt_id,
                from,
                action,
            } => write!(
                f,
                "Cannot {} attempt {}: attempt is {}",
                action, attempt_id, from
            ),
            AppError::AttemptInProgress { attempt_id } => write!(
                f,
                "Attempt {} has already been started and cannot be unassigned",
                attempt_id
            ),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let body = match &self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                json!({ "error": "Internal Server Error", "kind": kind })
            }
            AppError::InvalidTransition { from, action, .. } => json!({
                "error": self.to_string(),
                "kind": kind,
                "reason": action.rejection_reason(*from),
            }),
            _ => json!({ "error": self.to_string(), "kind": kind }),
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
