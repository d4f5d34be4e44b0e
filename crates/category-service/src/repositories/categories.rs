//! Category repository.
//!
//! Listings are ordered by name. Ids are strings: callers may pick their own
//! (`cat-scifi`), otherwise a random UUID is assigned on insert.

use crate::errors::CsError;
use crate::models::{Category, CategoryDraft};
use async_trait::async_trait;
use chrono::Utc;
use common::pagination::Pagination;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a category. A taken id is reported as `Conflict`.
    async fn create(&self, draft: CategoryDraft) -> Result<Category, CsError>;

    async fn get(&self, id: &str) -> Result<Option<Category>, CsError>;

    /// Replace name and description. `None` if the category does not exist.
    async fn update(&self, id: &str, draft: CategoryDraft) -> Result<Option<Category>, CsError>;

    /// `false` if there was nothing to delete.
    async fn delete(&self, id: &str) -> Result<bool, CsError>;

    /// One page of categories ordered by name, plus the total count.
    async fn list(&self, page: Pagination) -> Result<(Vec<Category>, i64), CsError>;
}

fn assigned_id(draft: &CategoryDraft) -> String {
    draft
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn already_exists(id: &str) -> CsError {
    CsError::Conflict(format!("Category '{id}' already exists"))
}

pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, draft: CategoryDraft) -> Result<Category, CsError> {
        let id = assigned_id(&draft);
        let query = format!(
            "INSERT INTO categories (id, name, description) \
             VALUES ($1, $2, $3) RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(&id)
            .bind(&draft.name)
            .bind(&draft.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    already_exists(&id)
                } else {
                    CsError::Database(format!("Failed to create category: {e}"))
                }
            })
    }

    async fn get(&self, id: &str) -> Result<Option<Category>, CsError> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CsError::Database(format!("Failed to fetch category: {e}")))
    }

    async fn update(&self, id: &str, draft: CategoryDraft) -> Result<Option<Category>, CsError> {
        let query = format!(
            "UPDATE categories SET name = $2, description = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CsError::Database(format!("Failed to update category: {e}")))
    }

    async fn delete(&self, id: &str) -> Result<bool, CsError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CsError::Database(format!("Failed to delete category: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<Category>, i64), CsError> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC, id LIMIT $1 OFFSET $2"
        );
        let categories = sqlx::query_as::<_, Category>(&query)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CsError::Database(format!("Failed to list categories: {e}")))?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        Ok((categories, total))
    }
}

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: RwLock<Vec<Category>>,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.categories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.categories.read().await.is_empty()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn create(&self, draft: CategoryDraft) -> Result<Category, CsError> {
        let id = assigned_id(&draft);
        let mut categories = self.categories.write().await;
        if categories.iter().any(|c| c.id == id) {
            return Err(already_exists(&id));
        }
        let now = Utc::now();
        let category = Category {
            id,
            name: draft.name,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        categories.push(category.clone());
        Ok(category)
    }

    async fn get(&self, id: &str) -> Result<Option<Category>, CsError> {
        let categories = self.categories.read().await;
        Ok(categories.iter().find(|c| c.id == id).cloned())
    }

    async fn update(&self, id: &str, draft: CategoryDraft) -> Result<Option<Category>, CsError> {
        let mut categories = self.categories.write().await;
        let Some(category) = categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        category.name = draft.name;
        category.description = draft.description;
        category.updated_at = Utc::now();
        Ok(Some(category.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, CsError> {
        let mut categories = self.categories.write().await;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        Ok(categories.len() < before)
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<Category>, i64), CsError> {
        let mut sorted = self.categories.read().await.clone();
        sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        let total = i64::try_from(sorted.len()).unwrap_or(i64::MAX);
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let data = sorted
            .into_iter()
            .skip(skip)
            .take(page.limit as usize)
            .collect();
        Ok((data, total))
    }
}
