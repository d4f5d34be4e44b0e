//! User profile lookup, listing and management.

use crate::errors::UsError;
use crate::handlers::auth_handler::request_deadline;
use crate::models::{DeleteResponse, UpdateUserRequest, UserPage, UserProfile};
use crate::observability::metrics::record_account_mutation;
use crate::routes::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use common::pagination::PageQuery;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

fn parse_user_id(raw: &str) -> Result<Uuid, UsError> {
    Uuid::parse_str(raw).map_err(|_| UsError::BadRequest("Invalid user id".to_string()))
}

fn mutation_result(e: &UsError) -> &'static str {
    match e {
        UsError::NotFound(_) => "not_found",
        UsError::Conflict(_) => "conflict",
        UsError::BadRequest(_) => "invalid",
        UsError::ServiceUnavailable(_) => "unavailable",
        _ => "error",
    }
}

/// Handler for GET /api/v1/users
#[instrument(skip_all, name = "us.handlers.list_users")]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>, UsError> {
    let page = state.accounts.list(query.pagination()).await?;
    Ok(Json(page))
}

/// Handler for GET /api/v1/users/:id
#[instrument(skip_all, name = "us.handlers.get_user")]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, UsError> {
    let id = parse_user_id(&id)?;
    let profile = state.accounts.profile(id).await?;
    Ok(Json(profile))
}

/// Handler for PUT /api/v1/users/:id
#[instrument(skip_all, name = "us.handlers.update_user")]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, UsError> {
    let id = parse_user_id(&id)?;
    match state.accounts.update(id, payload).await {
        Ok(profile) => {
            record_account_mutation("update", "success");
            Ok(Json(profile))
        }
        Err(e) => {
            record_account_mutation("update", mutation_result(&e));
            Err(e)
        }
    }
}

/// Handler for DELETE /api/v1/users/:id
///
/// Revokes every session the account holds before removing it.
#[instrument(skip_all, name = "us.handlers.delete_user")]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, UsError> {
    let id = parse_user_id(&id)?;
    let deadline = request_deadline(&state, &headers);
    match state.accounts.delete(id, &deadline).await {
        Ok(()) => {
            record_account_mutation("delete", "success");
            Ok(Json(DeleteResponse { success: true }))
        }
        Err(e) => {
            record_account_mutation("delete", mutation_result(&e));
            Err(e)
        }
    }
}
