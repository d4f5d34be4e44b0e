//! HTTP routes for the category service.

use crate::handlers::{self, category_handler};
use crate::middleware::http_metrics_middleware;
use crate::services::CategoryService;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
pub struct AppState {
    pub categories: CategoryService,
    pub max_request_timeout: Duration,
}

/// Build the application routes.
///
/// - `/health`, `/metrics` - operational
/// - `/api/v1/categories` - list (GET), create (POST)
/// - `/api/v1/categories/:id` - get, update, delete
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.max_request_timeout;

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/v1/categories",
            get(category_handler::list_categories).post(category_handler::create_category),
        )
        .route(
            "/api/v1/categories/:id",
            get(category_handler::get_category)
                .put(category_handler::update_category)
                .delete(category_handler::delete_category),
        )
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}
