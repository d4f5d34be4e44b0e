//! Observability for the category service.

pub mod metrics;
