//! HTTP handlers for the user service.

pub mod auth_handler;
pub mod health;
pub mod metrics;
pub mod session_handler;
pub mod user_handler;

pub use health::health_check;
pub use metrics::metrics_handler;
