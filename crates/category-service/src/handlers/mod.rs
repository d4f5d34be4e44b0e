//! HTTP handlers for the category service.

pub mod category_handler;
pub mod health;
pub mod metrics;

pub use health::health_check;
pub use metrics::metrics_handler;
