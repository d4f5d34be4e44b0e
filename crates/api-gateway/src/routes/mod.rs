//! HTTP routes for the API gateway.
//!
//! Access policy:
//!
//! | route                          | GET     | POST    | PUT     | DELETE |
//! |--------------------------------|---------|---------|---------|--------|
//! | `/api/v1/auth/*`               |         | public  |         |        |
//! | `/api/v1/me`                   | session |         |         |        |
//! | `/api/v1/users`                | admin   |         |         |        |
//! | `/api/v1/users/:id`            | session |         | admin   | admin  |
//! | `/api/v1/books[/:id]`          | public  | session | session | admin  |
//! | `/api/v1/books/search`         | public  |         |         |        |
//! | `/api/v1/categories[/:id]`     | public  | admin   | admin   | admin  |

use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    attach_deadline, http_metrics_middleware, require_role, require_session, AuthState,
};
use crate::services::{SessionAuthority, UpstreamClient};
use axum::{
    handler::Handler,
    middleware,
    routing::{get, post},
    Router,
};
use common::types::Role;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
pub struct AppState {
    pub config: Config,
    pub authority: Arc<dyn SessionAuthority>,
    pub upstream: UpstreamClient,
}

/// Build the application routes.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.config.request_timeout;
    let auth_state = Arc::new(AuthState {
        authority: state.authority.clone(),
        request_timeout,
    });

    let session = middleware::from_fn_with_state(auth_state.clone(), require_session);
    // Outermost first: authenticate, then check the role.
    let admin = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(auth_state.clone(), require_session))
        .layer(middleware::from_fn_with_state(Role::Admin, require_role));

    // Routes gated per method
    let proxied_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::proxy_users))
        .route("/api/v1/auth/login", post(handlers::proxy_users))
        .route("/api/v1/auth/logout", post(handlers::proxy_users))
        .route(
            "/api/v1/books",
            get(handlers::proxy_books).post(handlers::proxy_books.layer(session.clone())),
        )
        .route("/api/v1/books/search", get(handlers::proxy_books))
        .route(
            "/api/v1/books/:id",
            get(handlers::proxy_books)
                .put(handlers::proxy_books.layer(session.clone()))
                .delete(handlers::proxy_books.layer(admin.clone())),
        )
        .route(
            "/api/v1/categories",
            get(handlers::proxy_categories).post(handlers::proxy_categories.layer(admin.clone())),
        )
        .route(
            "/api/v1/categories/:id",
            get(handlers::proxy_categories)
                .put(handlers::proxy_categories.layer(admin.clone()))
                .delete(handlers::proxy_categories.layer(admin.clone())),
        )
        .route("/api/v1/users", get(handlers::proxy_users.layer(admin.clone())))
        .route(
            "/api/v1/users/:id",
            get(handlers::proxy_users.layer(session.clone()))
                .put(handlers::proxy_users.layer(admin.clone()))
                .delete(handlers::proxy_users.layer(admin)),
        )
        .with_state(state.clone());

    // Session required for every method
    let protected_routes = Router::new()
        .route("/api/v1/me", get(handlers::get_me))
        .route_layer(session)
        .with_state(state);

    let health_routes = Router::new().route("/health", get(handlers::health_check));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. attach_deadline (innermost, before any gate)
    // 2. TimeoutLayer, a backstop one second past the deadline
    // 3. TraceLayer
    // 4. http_metrics_middleware (outermost)
    health_routes
        .merge(metrics_routes)
        .merge(proxied_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(request_timeout, attach_deadline))
        .layer(TimeoutLayer::new(request_timeout + Duration::from_secs(1)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
