//! Liveness check.

/// Handler for GET /health
///
/// Does not call the category service or the database.
pub async fn health_check() -> &'static str {
    "OK"
}
