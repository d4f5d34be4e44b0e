//! Registration, login and logout handlers.

use crate::errors::UsError;
use crate::models::{LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, UserProfile};
use crate::observability::metrics::record_registration;
use crate::routes::AppState;
use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use common::bearer::extract_bearer;
use common::deadline::{Deadline, REQUEST_TIMEOUT_HEADER};
use std::sync::Arc;
use tracing::instrument;

/// Handle user registration
///
/// POST /api/v1/auth/register
#[instrument(skip_all, name = "us.handlers.register")]
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), UsError> {
    match state.credentials.register(payload).await {
        Ok(profile) => {
            record_registration("success");
            Ok((StatusCode::CREATED, Json(profile)))
        }
        Err(e) => {
            record_registration(match &e {
                UsError::Conflict(_) => "conflict",
                UsError::BadRequest(_) => "invalid",
                _ => "error",
            });
            Err(e)
        }
    }
}

/// Handle login
///
/// POST /api/v1/auth/login
#[instrument(skip_all, name = "us.handlers.login")]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, UsError> {
    let deadline = request_deadline(&state, &headers);
    let response = state
        .auth
        .login(&payload.username, &payload.password, &deadline)
        .await?;
    Ok(Json(response))
}

/// Handle logout
///
/// POST /api/v1/auth/logout
///
/// Requires a well-formed `Authorization: Bearer` header. The token does not
/// have to be valid; revoking an unknown session succeeds.
#[instrument(skip_all, name = "us.handlers.logout")]
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, UsError> {
    let token = extract_bearer(headers.get("authorization").map(|v| v.as_bytes())).map_err(|e| {
        tracing::debug!(target: "us.handlers.logout", error = %e, "Rejected logout");
        UsError::BadRequest(e.to_string())
    })?;

    let deadline = request_deadline(&state, &headers);
    state.auth.logout(token, &deadline).await?;
    Ok(Json(LogoutResponse { success: true }))
}

pub(crate) fn request_deadline(state: &AppState, headers: &HeaderMap) -> Deadline {
    Deadline::from_header(
        headers
            .get(REQUEST_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok()),
        state.max_request_timeout,
    )
}
