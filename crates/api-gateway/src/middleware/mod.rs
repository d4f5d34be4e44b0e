//! Middleware for the API gateway.
//!
//! - `auth` - request deadline, session gate and role gate
//! - `http_metrics` - HTTP request metrics

pub mod auth;
pub mod http_metrics;

pub use auth::{attach_deadline, require_role, require_session, AuthState};
pub use http_metrics::http_metrics_middleware;
