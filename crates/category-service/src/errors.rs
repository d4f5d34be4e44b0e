//! Category service error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl CsError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            CsError::Database(_) | CsError::Internal => 500,
            CsError::Validation(_) => 400,
            CsError::NotFound(_) => 404,
            CsError::Conflict(_) => 409,
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

impl IntoResponse for CsError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            CsError::Database(err) => {
                tracing::error!(target: "cs.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            CsError::Validation(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone()),
            CsError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            CsError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            CsError::Internal => (
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

impl From<sqlx::Error> for CsError {
    fn from(err: sqlx::Error) -> Self {
        CsError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CsError::Database("x".to_string()).status_code(), 500);
        assert_eq!(CsError::Validation("x".to_string()).status_code(), 400);
        assert_eq!(CsError::NotFound("x".to_string()).status_code(), 404);
        assert_eq!(CsError::Conflict("x".to_string()).status_code(), 409);
        assert_eq!(CsError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = CsError::NotFound("Category not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "Category not found");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response = CsError::Database("relation categories does not exist".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["message"], "An internal database error occurred");
    }
}
