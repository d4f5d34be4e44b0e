//! Observability for the book service.

pub mod metrics;
