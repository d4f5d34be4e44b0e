//! Book CRUD endpoints.
//!
//! Writes are gated at the gateway; this service trusts whatever reaches
//! it and only enforces data rules.

use crate::errors::BsError;
use crate::models::{Book, BookInput, BookPage, DeleteResponse, ListQuery};
use crate::routes::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use common::deadline::{Deadline, REQUEST_TIMEOUT_HEADER};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

fn parse_book_id(raw: &str) -> Result<Uuid, BsError> {
    Uuid::parse_str(raw).map_err(|_| BsError::Validation("Invalid book id".to_string()))
}

fn request_deadline(state: &AppState, headers: &HeaderMap) -> Deadline {
    Deadline::from_header(
        headers
            .get(REQUEST_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok()),
        state.max_request_timeout,
    )
}

/// GET /api/v1/books?page=&limit=&q=
#[instrument(skip_all, name = "bs.handlers.list_books")]
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<BookPage>, BsError> {
    let page = state.books.list(query.search_term(), query.pagination()).await?;
    Ok(Json(page))
}

/// POST /api/v1/books
///
/// - 201 with the stored book
/// - 400 for invalid fields or no categories
/// - 422 naming the first category that does not exist
/// - 503 when the category service cannot answer
#[instrument(skip_all, name = "bs.handlers.create_book")]
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<Book>), BsError> {
    let deadline = request_deadline(&state, &headers);
    let book = state.books.create(input, &deadline).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /api/v1/books/:id
#[instrument(skip_all, name = "bs.handlers.get_book")]
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Book>, BsError> {
    let book = state.books.get(parse_book_id(&id)?).await?;
    Ok(Json(book))
}

/// PUT /api/v1/books/:id
#[instrument(skip_all, name = "bs.handlers.update_book")]
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>, BsError> {
    let id = parse_book_id(&id)?;
    let deadline = request_deadline(&state, &headers);
    let book = state.books.update(id, input, &deadline).await?;
    Ok(Json(book))
}

/// DELETE /api/v1/books/:id
#[instrument(skip_all, name = "bs.handlers.delete_book")]
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, BsError> {
    state.books.delete(parse_book_id(&id)?).await?;
    Ok(Json(DeleteResponse { success: true }))
}
