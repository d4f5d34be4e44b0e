//! Book service error types.
//!
//! `ReferenceNotFound` (the caller named a category that does not exist) and
//! `ServiceUnavailable` (the category service could not answer) are kept
//! apart all the way to the response: one is the caller's mistake, the other
//! is worth retrying.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("At least one category must be selected")]
    EmptyReferences,

    #[error("Category not found: {0}")]
    ReferenceNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Internal server error")]
    Internal,
}

impl BsError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            BsError::Database(_) | BsError::Internal => 500,
            BsError::Validation(_) | BsError::EmptyReferences => 400,
            BsError::ReferenceNotFound(_) => 422,
            BsError::NotFound(_) => 404,
            BsError::ServiceUnavailable(_) | BsError::DeadlineExceeded(_) => 503,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for BsError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            BsError::Database(err) => {
                tracing::error!(target: "bs.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            BsError::Validation(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone()),
            BsError::EmptyReferences => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string())
            }
            BsError::ReferenceNotFound(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "REFERENCE_NOT_FOUND",
                self.to_string(),
            ),
            BsError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            BsError::ServiceUnavailable(reason) | BsError::DeadlineExceeded(reason) => {
                tracing::warn!(target: "bs.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            BsError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for BsError {
    fn from(err: sqlx::Error) -> Self {
        BsError::Database(err.to_string())
    }
}
