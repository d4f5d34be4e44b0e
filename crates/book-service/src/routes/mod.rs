//! HTTP routes for the book service.

use crate::handlers::{self, book_handler};
use crate::middleware::http_metrics_middleware;
use crate::services::BookService;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
pub struct AppState {
    pub books: BookService,
    /// Cap on the deadline a caller may request via `x-request-timeout-ms`.
    pub max_request_timeout: Duration,
}

/// Build the application routes.
///
/// - `/health`, `/metrics` - operational
/// - `/api/v1/books` - list/search (GET), create (POST)
/// - `/api/v1/books/search` - same as the list, `?q=` filtered
/// - `/api/v1/books/:id` - get, update, delete
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = state.max_request_timeout;

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/v1/books",
            get(book_handler::list_books).post(book_handler::create_book),
        )
        .route("/api/v1/books/search", get(book_handler::list_books))
        .route(
            "/api/v1/books/:id",
            get(book_handler::get_book)
                .put(book_handler::update_book)
                .delete(book_handler::delete_book),
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
