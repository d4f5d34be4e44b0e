//! Category CRUD endpoints.
//!
//! Writes are admin-gated at the gateway. `GET /api/v1/categories/:id` is
//! also the existence check other services rely on: 200 when the category
//! exists, 404 when it does not.

use crate::errors::CsError;
use crate::models::{Category, CategoryInput, CategoryPage, DeleteResponse};
use crate::routes::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use common::pagination::PageQuery;
use std::sync::Arc;
use tracing::instrument;

/// GET /api/v1/categories?page=&limit=
#[instrument(skip_all, name = "cs.handlers.list_categories")]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryPage>, CsError> {
    let page = state.categories.list(query.pagination()).await?;
    Ok(Json(page))
}

/// POST /api/v1/categories
#[instrument(skip_all, name = "cs.handlers.create_category")]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), CsError> {
    let category = state.categories.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/v1/categories/:id
#[instrument(skip_all, name = "cs.handlers.get_category")]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Category>, CsError> {
    let category = state.categories.get(&id).await?;
    Ok(Json(category))
}

/// PUT /api/v1/categories/:id
#[instrument(skip_all, name = "cs.handlers.update_category")]
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, CsError> {
    let category = state.categories.update(&id, input).await?;
    Ok(Json(category))
}

/// DELETE /api/v1/categories/:id
#[instrument(skip_all, name = "cs.handlers.delete_category")]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, CsError> {
    state.categories.delete(&id).await?;
    Ok(Json(DeleteResponse { success: true }))
}
