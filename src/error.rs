// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
///
/// Every variant is terminal: none of these represent transient faults, so
/// nothing here is ever retried on behalf of the caller.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (malformed or missing request data)
    BadRequest(String),

    // 401 Unauthorized (missing/invalid credential)
    AuthError(String),

    // 403 Forbidden (authenticated but not the owner of the target)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g. duplicate submission, duplicate email)
    Conflict(String),

    // 403, action attempted outside the assessment's open window
    WindowViolation(String),

    // 400, assessment already holds max_questions questions
    QuestionCapExceeded(String),

    // 503, identifier space collision retries exhausted
    ResourceExhausted(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
/// The body carries a stable `kind` next to the human message so the calling
/// shell can render failures without re-deriving semantics.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_input", msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, "unauthenticated", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::WindowViolation(msg) => (StatusCode::FORBIDDEN, "window_violation", msg),
            AppError::QuestionCapExceeded(msg) => {
                (StatusCode::BAD_REQUEST, "question_cap_exceeded", msg)
            }
            AppError::ResourceExhausted(msg) => {
                tracing::error!("Resource exhausted: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "resource_exhausted",
                    msg,
                )
            }
        };
        let body = Json(json!({
            "kind": kind,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// True when the error is the storage layer reporting a violated unique
/// constraint. Call sites that insert against a unique index use this to
/// tell "row already exists" apart from generic store failures.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
