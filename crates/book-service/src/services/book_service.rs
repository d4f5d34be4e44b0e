//! Book operations.
//!
//! A write moves through: fields checked locally, book existence checked
//! (update only), category references checked remotely, then persisted.
//! Any failure before the last step leaves storage untouched.
//!
//! The reference check and the write are not atomic. A category deleted in
//! between is not detected.
//!
//! Reads go through an optional [`ReadThroughCache`]; every committed write
//! invalidates it.

use crate::errors::BsError;
use crate::models::{Book, BookInput, BookPage, Pagination};
use crate::observability::metrics::{record_book_mutation, record_cache_lookup};
use crate::repositories::BookRepository;
use crate::services::reference_validator::ReferentialValidator;
use common::cache::ReadThroughCache;
use common::deadline::Deadline;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub struct BookService {
    books: Arc<dyn BookRepository>,
    references: ReferentialValidator,
    cache: Option<ReadThroughCache>,
}

fn mutation_result(err: &BsError) -> &'static str {
    match err {
        BsError::Validation(_) | BsError::EmptyReferences => "invalid",
        BsError::ReferenceNotFound(_) => "reference_not_found",
        BsError::NotFound(_) => "not_found",
        BsError::ServiceUnavailable(_) | BsError::DeadlineExceeded(_) => "unavailable",
        BsError::Database(_) | BsError::Internal => "error",
    }
}

fn book_not_found() -> BsError {
    BsError::NotFound("Book not found".to_string())
}

impl BookService {
    pub fn new(books: Arc<dyn BookRepository>, references: ReferentialValidator) -> Self {
        Self {
            books,
            references,
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

    #[instrument(skip_all, name = "bs.books.create")]
    pub async fn create(&self, input: BookInput, deadline: &Deadline) -> Result<Book, BsError> {
        let result = self.try_create(input, deadline).await;
        match &result {
            Ok(book) => {
                record_book_mutation("create", "success");
                tracing::info!(target: "bs.services.books", book_id = %book.id, "Book created");
            }
            Err(e) => record_book_mutation("create", mutation_result(e)),
        }
        result
    }

    async fn try_create(&self, input: BookInput, deadline: &Deadline) -> Result<Book, BsError> {
        let draft = input.validate()?;
        self.references.validate_all(&draft.category_ids, deadline).await?;
        let book = self.books.create(draft).await?;
        self.invalidate_cache().await;
        Ok(book)
    }

    #[instrument(skip_all, name = "bs.books.update", fields(book_id = %id))]
    pub async fn update(&self, id: Uuid, input: BookInput, deadline: &Deadline) -> Result<Book, BsError> {
        let result = self.try_update(id, input, deadline).await;
        match &result {
            Ok(_) => {
                record_book_mutation("update", "success");
                tracing::info!(target: "bs.services.books", book_id = %id, "Book updated");
            }
            Err(e) => record_book_mutation("update", mutation_result(e)),
        }
        result
    }

    async fn try_update(&self, id: Uuid, input: BookInput, deadline: &Deadline) -> Result<Book, BsError> {
        if self.books.get(id).await?.is_none() {
            return Err(book_not_found());
        }
        let draft = input.validate()?;
        self.references.validate_all(&draft.category_ids, deadline).await?;
        // Deleted between the existence check and the write.
        let book = self.books.update(id, draft).await?.ok_or_else(book_not_found)?;
        self.invalidate_cache().await;
        Ok(book)
    }

    #[instrument(skip_all, name = "bs.books.delete", fields(book_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), BsError> {
        match self.books.delete(id).await {
            Ok(true) => {
                self.invalidate_cache().await;
                record_book_mutation("delete", "success");
                tracing::info!(target: "bs.services.books", book_id = %id, "Book deleted");
                Ok(())
            }
            Ok(false) => {
                record_book_mutation("delete", "not_found");
                Err(book_not_found())
            }
            Err(e) => {
                record_book_mutation("delete", mutation_result(&e));
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Book, BsError> {
        let book = match &self.cache {
            Some(cache) => {
                let (book, outcome) = cache
                    .get_or_load(&format!("book:{id}"), move || self.books.get(id))
                    .await?;
                record_cache_lookup("book", outcome.as_str());
                book
            }
            None => self.books.get(id).await?,
        };
        book.ok_or_else(book_not_found)
    }

    /// A page of books, filtered by `term` when one is given.
    #[instrument(skip_all, name = "bs.books.list")]
    pub async fn list(&self, term: Option<&str>, page: Pagination) -> Result<BookPage, BsError> {
        let load = move || async move {
            let (data, total) = match term {
                Some(term) => self.books.search(term, page).await?,
                None => self.books.list(page).await?,
            };
            Ok::<_, BsError>(Some(page.page_of(data, total)))
        };

        let Some(cache) = &self.cache else {
            return load().await?.ok_or(BsError::Internal);
        };
        // The term goes last so no term can imitate another key's page/limit.
        let suffix = match term {
            Some(term) => format!("search:page:{}:limit:{}:{term}", page.page, page.limit),
            None => format!("list:page:{}:limit:{}", page.page, page.limit),
        };
        let (listed, outcome) = cache.get_or_load(&suffix, load).await?;
        record_cache_lookup("page", outcome.as_str());
        listed.ok_or(BsError::Internal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryBookRepository;
    use crate::services::category_directory::mock::RecordingCategoryDirectory;
    use common::cache::InMemoryCacheStore;
    use std::time::Duration;

    struct Harness {
        service: BookService,
        books: Arc<InMemoryBookRepository>,
        directory: Arc<RecordingCategoryDirectory>,
    }

    fn harness_with(directory: RecordingCategoryDirectory) -> Harness {
        let books = Arc::new(InMemoryBookRepository::new());
        let directory = Arc::new(directory);
        Harness {
            service: BookService::new(books.clone(), ReferentialValidator::new(directory.clone())),
            books,
            directory,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingCategoryDirectory::with_categories([
            "cat-ok-1", "cat-ok-3", "cat-fiction",
        ]))
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn input(categories: &[&str]) -> BookInput {
        BookInput {
            title: "The Left Hand of Darkness".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            isbn: "978-0441478125".to_string(),
            published_year: 1969,
            category_ids: categories.iter().map(|c| (*c).to_string()).collect(),
            stock: 4,
        }
    }

    #[tokio::test]
    async fn test_create_with_existing_categories_persists() {
        let h = harness();
        let book = h.service.create(input(&["cat-ok-1", "cat-ok-3"]), &deadline()).await.unwrap();

        assert_eq!(book.category_ids, vec!["cat-ok-1", "cat-ok-3"]);
        assert_eq!(h.service.get(book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn test_create_with_missing_category_persists_nothing() {
        let h = harness();
        let result = h
            .service
            .create(
                input(&["cat-ok-1", "cat-missing-2", "cat-ok-3", "cat-missing-4"]),
                &deadline(),
            )
            .await;

        assert!(matches!(result, Err(BsError::ReferenceNotFound(ref id)) if id == "cat-missing-2"));
        assert!(h.books.is_empty().await);
        assert_eq!(h.directory.lookups(), vec!["cat-ok-1", "cat-missing-2"]);
    }

    #[tokio::test]
    async fn test_create_without_categories_makes_no_lookups() {
        let h = harness();
        let result = h.service.create(input(&[]), &deadline()).await;

        assert!(matches!(result, Err(BsError::EmptyReferences)));
        assert!(h.directory.lookups().is_empty());
        assert!(h.books.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_fields_rejected_before_lookups() {
        let h = harness();
        let mut bad = input(&["cat-ok-1"]);
        bad.published_year = -3;

        let result = h.service.create(bad, &deadline()).await;
        assert!(matches!(result, Err(BsError::Validation(_))));
        assert!(h.directory.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_directory_blocks_create() {
        let h = harness_with(RecordingCategoryDirectory::failing());
        let result = h.service.create(input(&["cat-ok-1"]), &deadline()).await;

        assert!(matches!(result, Err(BsError::ServiceUnavailable(_))));
        assert!(h.books.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_revalidates_references() {
        let h = harness();
        let book = h.service.create(input(&["cat-fiction"]), &deadline()).await.unwrap();

        let result = h.service.update(book.id, input(&["cat-missing-2"]), &deadline()).await;
        assert!(matches!(result, Err(BsError::ReferenceNotFound(ref id)) if id == "cat-missing-2"));
        assert_eq!(h.service.get(book.id).await.unwrap().category_ids, vec!["cat-fiction"]);

        let mut changes = input(&["cat-ok-1", "cat-ok-3"]);
        changes.stock = 0;
        let updated = h.service.update(book.id, changes, &deadline()).await.unwrap();
        assert_eq!(updated.category_ids, vec!["cat-ok-1", "cat-ok-3"]);
        assert_eq!(updated.stock, 0);
    }

    #[tokio::test]
    async fn test_update_unknown_book_is_not_found_without_lookups() {
        let h = harness();
        let result = h.service.update(Uuid::new_v4(), input(&["cat-ok-1"]), &deadline()).await;

        assert!(matches!(result, Err(BsError::NotFound(_))));
        assert!(h.directory.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let h = harness();
        let book = h.service.create(input(&["cat-fiction"]), &deadline()).await.unwrap();

        h.service.delete(book.id).await.unwrap();
        assert!(matches!(h.service.get(book.id).await, Err(BsError::NotFound(_))));
        assert!(matches!(h.service.delete(book.id).await, Err(BsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let h = harness();
        h.service.create(input(&["cat-fiction"]), &deadline()).await.unwrap();
        let mut other = input(&["cat-fiction"]);
        other.title = "Kindred".to_string();
        other.author = "Octavia E. Butler".to_string();
        h.service.create(other, &deadline()).await.unwrap();

        let all = h.service.list(None, Pagination::default()).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!((all.page, all.limit), (1, 10));

        let found = h.service.list(Some("butler"), Pagination::default()).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.data.first().unwrap().title, "Kindred");
    }

    fn cached_harness() -> (Harness, Arc<InMemoryCacheStore>) {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut h = harness();
        h.service = BookService::new(
            h.books.clone(),
            ReferentialValidator::new(h.directory.clone()),
        )
        .with_cache(ReadThroughCache::new(store.clone(), "books", Duration::from_secs(60)));
        (h, store)
    }

    #[tokio::test]
    async fn test_cached_reads_see_every_write() {
        let (h, store) = cached_harness();
        let book = h.service.create(input(&["cat-fiction"]), &deadline()).await.unwrap();

        assert_eq!(h.service.get(book.id).await.unwrap(), book);
        assert_eq!(h.service.list(None, Pagination::default()).await.unwrap().total, 1);
        assert!(!store.is_empty().await);

        let mut changes = input(&["cat-ok-1"]);
        changes.title = "Changed".to_string();
        h.service.update(book.id, changes, &deadline()).await.unwrap();
        assert_eq!(h.service.get(book.id).await.unwrap().title, "Changed");

        h.service.create(input(&["cat-fiction"]), &deadline()).await.unwrap();
        assert_eq!(h.service.list(None, Pagination::default()).await.unwrap().total, 2);

        h.service.delete(book.id).await.unwrap();
        assert!(matches!(h.service.get(book.id).await, Err(BsError::NotFound(_))));
        assert_eq!(h.service.list(None, Pagination::default()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_search_pages_are_cached_per_term() {
        let (h, _store) = cached_harness();
        h.service.create(input(&["cat-fiction"]), &deadline()).await.unwrap();

        let found = h.service.list(Some("le guin"), Pagination::default()).await.unwrap();
        let none = h.service.list(Some("butler"), Pagination::default()).await.unwrap();
        assert_eq!((found.total, none.total), (1, 0));
    }

    #[tokio::test]
    async fn test_unavailable_cache_serves_from_storage() {
        let (h, store) = cached_harness();
        store.set_available(false);

        let book = h.service.create(input(&["cat-fiction"]), &deadline()).await.unwrap();
        assert_eq!(h.service.get(book.id).await.unwrap(), book);
        assert_eq!(h.service.list(None, Pagination::default()).await.unwrap().total, 1);
    }
}
