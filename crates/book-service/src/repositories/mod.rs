//! Book storage.

pub mod books;

pub use books::{BookRepository, InMemoryBookRepository, PgBookRepository};
