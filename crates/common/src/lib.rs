//! Common utilities and types shared across Bookshelf services.

#![warn(clippy::pedantic)]

/// Module for identity and role types
pub mod types;

/// Module for shared configuration parsing
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for session token claims and validation constants
pub mod jwt;

/// Module for `Authorization: Bearer` header parsing
pub mod bearer;

/// Module for per-request deadlines propagated across services
pub mod deadline;

/// Module for the session-validation wire contract between services
pub mod session;

/// Module for page/limit parsing and the shared list response shape
pub mod pagination;

/// Module for the Redis read-through cache used by the catalogue services
pub mod cache;
