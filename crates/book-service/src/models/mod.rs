//! Book payloads and list parameters.

use crate::errors::BsError;
use chrono::{DateTime, Utc};
use common::pagination::Page;
pub use common::pagination::Pagination;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Book row (maps to the `books` table) and API representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
    pub category_ids: Vec<String>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update body. Every field defaults so missing values reach
/// [`BookInput::validate`] instead of failing JSON extraction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
    pub category_ids: Vec<String>,
    pub stock: i32,
}

/// A [`BookInput`] whose own fields are valid. Its category references are
/// not yet checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
    pub category_ids: Vec<String>,
    pub stock: i32,
}

impl BookInput {
    /// Check the fields that need no remote lookup.
    ///
    /// An empty `category_ids` is not rejected here; the reference check
    /// reports it as [`BsError::EmptyReferences`].
    pub fn validate(self) -> Result<BookDraft, BsError> {
        let title = self.title.trim();
        let author = self.author.trim();
        let isbn = self.isbn.trim();

        if title.is_empty() {
            return Err(BsError::Validation("title is required".to_string()));
        }
        if author.is_empty() {
            return Err(BsError::Validation("author is required".to_string()));
        }
        if isbn.is_empty() {
            return Err(BsError::Validation("ISBN is required".to_string()));
        }
        if self.published_year <= 0 {
            return Err(BsError::Validation(
                "published year must be a positive number".to_string(),
            ));
        }
        if self.stock < 0 {
            return Err(BsError::Validation("stock cannot be negative".to_string()));
        }

        let category_ids: Vec<String> = self
            .category_ids
            .iter()
            .map(|id| id.trim().to_string())
            .collect();
        if category_ids.iter().any(String::is_empty) {
            return Err(BsError::Validation(
                "category ids must not be blank".to_string(),
            ));
        }
        if category_ids.iter().any(|id| is_dot_segment(id)) {
            return Err(BsError::Validation(
                "category ids must not be '.' or '..'".to_string(),
            ));
        }

        Ok(BookDraft {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            published_year: self.published_year,
            category_ids,
            stock: self.stock,
        })
    }
}

/// `.` and `..` collapse when used as a URL path segment, so they can never
/// name a single category.
pub fn is_dot_segment(id: &str) -> bool {
    matches!(id, "." | "..")
}

/// Raw list query. Values stay strings so junk falls back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_raw(self.page.as_deref(), self.limit.as_deref())
    }

    /// Trimmed search term, if one was given.
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

pub type BookPage = Page<Book>;

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}
