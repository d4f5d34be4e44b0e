//! Authentication gates for protected routes.
//!
//! - `attach_deadline` stamps every request with its total time budget
//! - `require_session` validates the bearer token with the user service and
//!   attaches the resulting [`Identity`] to the request
//! - `require_role` rejects identities below a required [`Role`]
//!
//! A malformed `Authorization` header is rejected before any network call.

use crate::errors::GwError;
use crate::observability::metrics::record_auth_decision;
use crate::services::SessionAuthority;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use common::bearer::extract_bearer;
use common::deadline::Deadline;
use common::types::{Identity, Role};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// State for the session gate.
#[derive(Clone)]
pub struct AuthState {
    pub authority: Arc<dyn SessionAuthority>,
    /// Fallback budget when `attach_deadline` did not run.
    pub request_timeout: Duration,
}

/// Start the request's deadline. Applied to every route.
pub async fn attach_deadline(
    State(request_timeout): State<Duration>,
    mut req: Request,
    next: Next,
) -> Response {
    req.extensions_mut().insert(Deadline::after(request_timeout));
    next.run(req).await
}

/// Session gate.
///
/// # Response
///
/// - 401 if the header is missing or malformed, or the session is invalid
/// - 503 if the user service cannot answer
/// - 504 if the request deadline runs out while waiting
/// - Otherwise continues with `Identity` in extensions
#[instrument(skip_all, name = "gw.middleware.auth")]
pub async fn require_session(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GwError> {
    let start = Instant::now();

    let token = extract_bearer(req.headers().get(AUTHORIZATION).map(|v| v.as_bytes()))
        .map_err(|e| {
            tracing::debug!(target: "gw.middleware.auth", error = %e, "Rejected Authorization header");
            record_auth_decision("rejected", start.elapsed());
            GwError::InvalidToken(e.to_string())
        })?
        .to_string();

    let deadline = req
        .extensions()
        .get::<Deadline>()
        .copied()
        .unwrap_or_else(|| Deadline::after(state.request_timeout));

    let identity = match state.authority.validate(&token, &deadline).await {
        Ok(identity) => identity,
        Err(e) => {
            record_auth_decision(
                match &e {
                    GwError::InvalidToken(_) => "rejected",
                    GwError::GatewayTimeout(_) => "timeout",
                    _ => "unavailable",
                },
                start.elapsed(),
            );
            return Err(e);
        }
    };

    record_auth_decision("allowed", start.elapsed());
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Role gate. Must run inside `require_session`.
///
/// Roles are ordered, so an admin passes a `user` requirement.
pub async fn require_role(
    State(required): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, GwError> {
    let Some(identity) = req.extensions().get::<Identity>() else {
        return Err(GwError::InvalidToken(
            "Authentication required".to_string(),
        ));
    };

    if !identity.role.satisfies(required) {
        tracing::debug!(target: "gw.middleware.auth", role = %identity.role, required = %required, "Insufficient role");
        record_auth_decision("forbidden", Duration::ZERO);
        return Err(GwError::Forbidden(format!("Requires {required} role")));
    }

    Ok(next.run(req).await)
}
