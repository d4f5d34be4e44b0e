//! Reverse-proxy handlers.
//!
//! One handler per upstream. Gating happens in middleware; by the time a
//! handler runs, a protected request already carries its `Identity`.

use crate::errors::GwError;
use crate::routes::AppState;
use crate::services::Upstream;
use axum::{extract::Request, extract::State, response::Response};
use common::deadline::Deadline;
use common::types::Identity;
use std::sync::Arc;

async fn forward(state: &AppState, upstream: Upstream, request: Request) -> Result<Response, GwError> {
    let base_url = match upstream {
        Upstream::Users => &state.config.user_service_url,
        Upstream::Books => &state.config.book_service_url,
        Upstream::Categories => &state.config.category_service_url,
    };
    let identity = request.extensions().get::<Identity>().cloned();
    let deadline = request
        .extensions()
        .get::<Deadline>()
        .copied()
        .unwrap_or_else(|| Deadline::after(state.config.request_timeout));

    state
        .upstream
        .forward(upstream, base_url, request, identity.as_ref(), &deadline)
        .await
}

/// Auth and user routes, forwarded to the user service.
pub async fn proxy_users(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, GwError> {
    forward(&state, Upstream::Users, request).await
}

/// Book routes, forwarded to the book service.
pub async fn proxy_books(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, GwError> {
    forward(&state, Upstream::Books, request).await
}

/// Category routes, forwarded to the category service.
pub async fn proxy_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, GwError> {
    forward(&state, Upstream::Categories, request).await
}
