//! Category operations.
//!
//! Reads go through an optional [`ReadThroughCache`]; every committed write
//! invalidates it, so a deleted category stops resolving for reference
//! checks at once.
//!
//! Deleting a category does not look at the books that reference it.

use crate::errors::CsError;
use crate::models::{Category, CategoryInput, CategoryPage};
use crate::observability::metrics::{record_cache_lookup, record_category_mutation};
use crate::repositories::CategoryRepository;
use common::cache::ReadThroughCache;
use common::pagination::Pagination;
use std::sync::Arc;
use tracing::instrument;

pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
    cache: Option<ReadThroughCache>,
}

fn mutation_result(err: &CsError) -> &'static str {
    match err {
        CsError::Validation(_) => "invalid",
        CsError::NotFound(_) => "not_found",
        CsError::Conflict(_) => "conflict",
        CsError::Database(_) | CsError::Internal => "error",
    }
}

fn category_not_found() -> CsError {
    CsError::NotFound("Category not found".to_string())
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self {
            categories,
            cache: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ReadThroughCache) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate().await;
        }
    }

    fn record(operation: &str, result: &Result<Category, CsError>) {
        match result {
            Ok(category) => {
                record_category_mutation(operation, "success");
                tracing::info!(target: "cs.services.categories", category_id = %category.id, operation, "Category written");
            }
            Err(e) => record_category_mutation(operation, mutation_result(e)),
        }
    }

    #[instrument(skip_all, name = "cs.categories.create")]
    pub async fn create(&self, input: CategoryInput) -> Result<Category, CsError> {
        let result = async {
            let category = self.categories.create(input.validate()?).await?;
            self.invalidate_cache().await;
            Ok::<_, CsError>(category)
        }
        .await;
        Self::record("create", &result);
        result
    }

    /// Replace name and description. Any `id` in the body is ignored.
    #[instrument(skip_all, name = "cs.categories.update", fields(category_id = %id))]
    pub async fn update(&self, id: &str, mut input: CategoryInput) -> Result<Category, CsError> {
        input.id = None;
        let result = async {
            if self.categories.get(id).await?.is_none() {
                return Err(category_not_found());
            }
            let draft = input.validate()?;
            let category = self
                .categories
                .update(id, draft)
                .await?
                .ok_or_else(category_not_found)?;
            self.invalidate_cache().await;
            Ok::<_, CsError>(category)
        }
        .await;
        Self::record("update", &result);
        result
    }

    #[instrument(skip_all, name = "cs.categories.delete", fields(category_id = %id))]
    pub async fn delete(&self, id: &str) -> Result<(), CsError> {
        match self.categories.delete(id).await {
            Ok(true) => {
                self.invalidate_cache().await;
                record_category_mutation("delete", "success");
                tracing::info!(target: "cs.services.categories", category_id = %id, "Category deleted");
                Ok(())
            }
            Ok(false) => {
                record_category_mutation("delete", "not_found");
                Err(category_not_found())
            }
            Err(e) => {
                record_category_mutation("delete", mutation_result(&e));
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<Category, CsError> {
        let category = match &self.cache {
            Some(cache) => {
                let (category, outcome) = cache
                    .get_or_load(&format!("category:{id}"), move || self.categories.get(id))
                    .await?;
                record_cache_lookup("category", outcome.as_str());
                category
            }
            None => self.categories.get(id).await?,
        };
        category.ok_or_else(category_not_found)
    }

    #[instrument(skip_all, name = "cs.categories.list")]
    pub async fn list(&self, page: Pagination) -> Result<CategoryPage, CsError> {
        let load = move || async move {
            let (data, total) = self.categories.list(page).await?;
            Ok::<_, CsError>(Some(page.page_of(data, total)))
        };

        let Some(cache) = &self.cache else {
            return load().await?.ok_or(CsError::Internal);
        };
        let suffix = format!("list:page:{}:limit:{}", page.page, page.limit);
        let (listed, outcome) = cache.get_or_load(&suffix, load).await?;
        record_cache_lookup("page", outcome.as_str());
        listed.ok_or(CsError::Internal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryCategoryRepository;
    use common::cache::InMemoryCacheStore;
    use std::time::Duration;

    fn input(id: Option<&str>, name: &str) -> CategoryInput {
        CategoryInput {
            id: id.map(str::to_string),
            name: name.to_string(),
            description: "Shelf".to_string(),
        }
    }

    fn service() -> CategoryService {
        CategoryService::new(Arc::new(InMemoryCategoryRepository::new()))
    }

    fn cached() -> (CategoryService, Arc<InMemoryCacheStore>) {
        let store = Arc::new(InMemoryCacheStore::new());
        let service = service().with_cache(ReadThroughCache::new(
            store.clone(),
            "categories",
            Duration::from_secs(60),
        ));
        (service, store)
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let service = service();
        let created = service.create(input(Some("cat-fantasy"), "Fantasy")).await.unwrap();
        service.create(input(None, "Biography")).await.unwrap();

        assert_eq!(service.get("cat-fantasy").await.unwrap(), created);
        let page = service.list(Pagination::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data.first().map(|c| c.name.as_str()), Some("Biography"));
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_validates() {
        let service = service();
        service.create(input(Some("cat-a"), "A")).await.unwrap();

        let updated = service.update("cat-a", input(Some("cat-b"), "Renamed")).await.unwrap();
        assert_eq!(updated.id, "cat-a");
        assert_eq!(updated.name, "Renamed");

        let blank = service.update("cat-a", input(None, " ")).await;
        assert!(matches!(blank, Err(CsError::Validation(_))));

        let missing = service.update("cat-missing", input(None, "X")).await;
        assert!(matches!(missing, Err(CsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let service = service();
        service.create(input(Some("cat-a"), "A")).await.unwrap();

        service.delete("cat-a").await.unwrap();
        assert!(matches!(service.get("cat-a").await, Err(CsError::NotFound(_))));
        assert!(matches!(service.delete("cat-a").await, Err(CsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cached_reads_see_delete() {
        let (service, store) = cached();
        service.create(input(Some("cat-a"), "A")).await.unwrap();

        assert_eq!(service.get("cat-a").await.unwrap().name, "A");
        assert_eq!(service.list(Pagination::default()).await.unwrap().total, 1);
        assert!(!store.is_empty().await);

        service.update("cat-a", input(None, "A2")).await.unwrap();
        assert_eq!(service.get("cat-a").await.unwrap().name, "A2");

        service.delete("cat-a").await.unwrap();
        assert!(matches!(service.get("cat-a").await, Err(CsError::NotFound(_))));
        assert_eq!(service.list(Pagination::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_unavailable_cache_serves_from_storage() {
        let (service, store) = cached();
        store.set_available(false);

        service.create(input(Some("cat-a"), "A")).await.unwrap();
        assert_eq!(service.get("cat-a").await.unwrap().id, "cat-a");
        assert_eq!(service.list(Pagination::default()).await.unwrap().total, 1);
    }
}
