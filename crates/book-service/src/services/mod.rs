//! Book service business logic.

pub mod book_service;
pub mod category_directory;
pub mod reference_validator;

pub use book_service::BookService;
pub use category_directory::mock::RecordingCategoryDirectory;
pub use category_directory::{CategoryDirectory, HttpCategoryDirectory};
pub use reference_validator::ReferentialValidator;
