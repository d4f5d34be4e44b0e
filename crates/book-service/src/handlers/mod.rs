//! HTTP handlers for the book service.

pub mod book_handler;
pub mod health;
pub mod metrics;

pub use health::health_check;
pub use metrics::metrics_handler;
