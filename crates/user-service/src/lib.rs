//! User Service Library
//!
//! Owns user accounts and sessions for Bookshelf:
//!
//! - Registration and password login
//! - Issuing signed session tokens
//! - The revocable session registry (Redis)
//! - Session validation for the API gateway
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
