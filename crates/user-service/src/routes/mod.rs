//! HTTP routes for the user service.

use crate::handlers::{self, auth_handler, session_handler, user_handler};
use crate::middleware::http_metrics_middleware;
use crate::services::{AccountService, AuthService, CredentialStore, SessionValidator};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use common::session::VALIDATE_SESSION_PATH;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
pub struct AppState {
    pub auth: AuthService,
    pub accounts: AccountService,
    pub credentials: Arc<CredentialStore>,
    pub sessions: SessionValidator,
    /// Cap on the deadline a caller may request via `x-request-timeout-ms`.
    pub max_request_timeout: Duration,
}

/// Build the application routes.
///
/// - `/health`, `/metrics` - operational, unauthenticated
/// - `/api/v1/auth/{register,login,logout}` - public auth endpoints
/// - `/api/v1/users` - account listing (admin-gated at the gateway)
/// - `/api/v1/users/:id` - profile lookup, edit and delete (gated at the gateway)
/// - `/internal/v1/sessions/validate` - session check for the gateway
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.max_request_timeout;

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/auth/register", post(auth_handler::handle_register))
        .route("/api/v1/auth/login", post(auth_handler::handle_login))
        .route("/api/v1/auth/logout", post(auth_handler::handle_logout))
        .route("/api/v1/users", get(user_handler::list_users))
        .route(
            "/api/v1/users/:id",
            get(user_handler::get_user)
                .put(user_handler::update_user)
                .delete(user_handler::delete_user),
        )
        .route(VALIDATE_SESSION_PATH, post(session_handler::handle_validate))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees every response)
    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}
