//! Book repository.
//!
//! `PgBookRepository` backs production; `InMemoryBookRepository` backs tests
//! and local runs without a database. Both order listings newest first.

use crate::errors::BsError;
use crate::models::{Book, BookDraft, Pagination};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn create(&self, draft: BookDraft) -> Result<Book, BsError>;

    async fn get(&self, id: Uuid) -> Result<Option<Book>, BsError>;

    /// Replace every mutable field. `None` if the book does not exist.
    async fn update(&self, id: Uuid, draft: BookDraft) -> Result<Option<Book>, BsError>;

    /// `false` if there was nothing to delete.
    async fn delete(&self, id: Uuid) -> Result<bool, BsError>;

    /// One page of books plus the total count.
    async fn list(&self, page: Pagination) -> Result<(Vec<Book>, i64), BsError>;

    /// Case-insensitive substring match on title, author or ISBN.
    async fn search(&self, term: &str, page: Pagination) -> Result<(Vec<Book>, i64), BsError>;
}

pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOK_COLUMNS: &str =
    "id, title, author, isbn, published_year, category_ids, stock, created_at, updated_at";

/// `%term%` for ILIKE with the pattern metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn create(&self, draft: BookDraft) -> Result<Book, BsError> {
        let query = format!(
            "INSERT INTO books (title, author, isbn, published_year, category_ids, stock) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {BOOK_COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(&draft.title)
            .bind(&draft.author)
            .bind(&draft.isbn)
            .bind(draft.published_year)
            .bind(&draft.category_ids)
            .bind(draft.stock)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BsError::Database(format!("Failed to create book: {e}")))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Book>, BsError> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BsError::Database(format!("Failed to fetch book: {e}")))
    }

    async fn update(&self, id: Uuid, draft: BookDraft) -> Result<Option<Book>, BsError> {
        let query = format!(
            "UPDATE books SET title = $2, author = $3, isbn = $4, published_year = $5, \
             category_ids = $6, stock = $7, updated_at = NOW() \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .bind(&draft.title)
            .bind(&draft.author)
            .bind(&draft.isbn)
            .bind(draft.published_year)
            .bind(&draft.category_ids)
            .bind(draft.stock)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BsError::Database(format!("Failed to update book: {e}")))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, BsError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| BsError::Database(format!("Failed to delete book: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<Book>, i64), BsError> {
        let query = format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        );
        let books = sqlx::query_as::<_, Book>(&query)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BsError::Database(format!("Failed to list books: {e}")))?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok((books, total))
    }

    async fn search(&self, term: &str, page: Pagination) -> Result<(Vec<Book>, i64), BsError> {
        let pattern = like_pattern(term);
        let filter = "title ILIKE $1 OR author ILIKE $1 OR isbn ILIKE $1";

        let query = format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE {filter} \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        );
        let books = sqlx::query_as::<_, Book>(&query)
            .bind(&pattern)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BsError::Database(format!("Failed to search books: {e}")))?;

        let count_query = format!("SELECT COUNT(*) FROM books WHERE {filter}");
        let (total,): (i64,) = sqlx::query_as(&count_query)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        Ok((books, total))
    }
}

/// Books kept in insertion order; listings read it back to front.
#[derive(Default)]
pub struct InMemoryBookRepository {
    books: RwLock<Vec<Book>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.books.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.books.read().await.is_empty()
    }
}

fn paginate<'a>(books: impl Iterator<Item = &'a Book>, page: Pagination) -> (Vec<Book>, i64) {
    let matching: Vec<&Book> = books.collect();
    let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let data = matching
        .into_iter()
        .skip(skip)
        .take(page.limit as usize)
        .cloned()
        .collect();
    (data, total)
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn create(&self, draft: BookDraft) -> Result<Book, BsError> {
        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            title: draft.title,
            author: draft.author,
            isbn: draft.isbn,
            published_year: draft.published_year,
            category_ids: draft.category_ids,
            stock: draft.stock,
            created_at: now,
            updated_at: now,
        };
        self.books.write().await.push(book.clone());
        Ok(book)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Book>, BsError> {
        let books = self.books.read().await;
        Ok(books.iter().find(|b| b.id == id).cloned())
    }

    async fn update(&self, id: Uuid, draft: BookDraft) -> Result<Option<Book>, BsError> {
        let mut books = self.books.write().await;
        let Some(book) = books.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        book.title = draft.title;
        book.author = draft.author;
        book.isbn = draft.isbn;
        book.published_year = draft.published_year;
        book.category_ids = draft.category_ids;
        book.stock = draft.stock;
        book.updated_at = Utc::now();
        Ok(Some(book.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, BsError> {
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|b| b.id != id);
        Ok(books.len() < before)
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<Book>, i64), BsError> {
        let books = self.books.read().await;
        Ok(paginate(books.iter().rev(), page))
    }

    async fn search(&self, term: &str, page: Pagination) -> Result<(Vec<Book>, i64), BsError> {
        let needle = term.to_lowercase();
        let books = self.books.read().await;
        Ok(paginate(
            books.iter().rev().filter(|b| {
                b.title.to_lowercase().contains(&needle)
                    || b.author.to_lowercase().contains(&needle)
                    || b.isbn.to_lowercase().contains(&needle)
            }),
            page,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn draft(title: &str, author: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: author.to_string(),
            isbn: format!("isbn-{title}"),
            published_year: 1990,
            category_ids: vec!["cat-fiction".to_string()],
            stock: 1,
        }
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("dune"), "%dune%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let repo = InMemoryBookRepository::new();
        let created = repo.create(draft("Dune", "Frank Herbert")).await.unwrap();
        assert_eq!(repo.get(created.id).await.unwrap().unwrap(), created);

        let mut changes = draft("Dune Messiah", "Frank Herbert");
        changes.stock = 9;
        let updated = repo.update(created.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.stock, 9);
        assert_eq!(updated.created_at, created.created_at);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.get(created.id).await.unwrap().is_none());
        assert!(repo.update(created.id, draft("x", "y")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_pages() {
        let repo = InMemoryBookRepository::new();
        for title in ["first", "second", "third"] {
            repo.create(draft(title, "anon")).await.unwrap();
        }

        let (page_one, total) = repo.list(Pagination { page: 1, limit: 2 }).await.unwrap();
        assert_eq!(total, 3);
        let titles: Vec<&str> = page_one.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second"]);

        let (page_two, _) = repo.list(Pagination { page: 2, limit: 2 }).await.unwrap();
        assert_eq!(page_two.len(), 1);
        assert_eq!(page_two.first().unwrap().title, "first");

        let (beyond, total) = repo.list(Pagination { page: 5, limit: 2 }).await.unwrap();
        assert!(beyond.is_empty());
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_across_fields() {
        let repo = InMemoryBookRepository::new();
        repo.create(draft("Dune", "Frank Herbert")).await.unwrap();
        repo.create(draft("Emma", "Jane Austen")).await.unwrap();

        let (by_author, total) = repo.search("HERBERT", Pagination::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(by_author.first().unwrap().title, "Dune");

        let (by_isbn, _) = repo.search("isbn-emma", Pagination::default()).await.unwrap();
        assert_eq!(by_isbn.first().unwrap().author, "Jane Austen");

        let (none, total) = repo.search("tolkien", Pagination::default()).await.unwrap();
        assert!(none.is_empty());
        assert_eq!(total, 0);
    }
}
