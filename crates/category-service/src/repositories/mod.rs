//! Category storage.

pub mod categories;

pub use categories::{CategoryRepository, InMemoryCategoryRepository, PgCategoryRepository};
