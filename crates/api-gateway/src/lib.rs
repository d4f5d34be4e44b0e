//! API Gateway Library
//!
//! Single entry point for Bookshelf clients. Every protected request is
//! authenticated against the user service before it is forwarded:
//!
//! - Bearer extraction (malformed headers never leave the gateway)
//! - Session validation via the user service's internal endpoint
//! - Role gating (`user` < `admin`)
//! - Reverse proxy to the user, book and category services with the
//!   authenticated identity injected as `x-user-*` headers
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - `/api/v1/me`, proxy handlers, health and metrics
//! - `middleware` - Deadline, session and role gates
//! - `services` - Session authority client and upstream forwarder
//! - `routes` - Axum router setup

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod services;
