//! Book Service Library
//!
//! Owns book records. Every book references one or more categories owned
//! by the category service; those references are checked over the network
//! before any write.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//!                                        |
//!                                        +-> category service (HTTP)
//! ```

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
