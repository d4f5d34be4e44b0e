//! Internal session validation endpoint, called by the gateway on every
//! protected request.

use crate::errors::UsError;
use crate::routes::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use common::deadline::{Deadline, REQUEST_TIMEOUT_HEADER};
use common::session::{ValidateSessionRequest, ValidateSessionResponse};
use std::sync::Arc;
use tracing::instrument;

/// Handle session validation
///
/// POST /internal/v1/sessions/validate
///
/// - 200 with the identity when the session is live
/// - 401 when the token is invalid, expired or revoked
/// - 503 when the registry is unavailable or the caller's deadline expires
#[instrument(skip_all, name = "us.handlers.validate_session")]
pub async fn handle_validate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ValidateSessionRequest>,
) -> Result<Json<ValidateSessionResponse>, UsError> {
    let deadline = Deadline::from_header(
        headers
            .get(REQUEST_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok()),
        state.max_request_timeout,
    );

    let identity = state.sessions.authorize(&payload.token, &deadline).await?;
    Ok(Json(ValidateSessionResponse::from(identity)))
}
