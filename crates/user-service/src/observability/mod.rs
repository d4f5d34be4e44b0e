//! Observability for the user service.

pub mod metrics;
