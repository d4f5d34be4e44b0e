//! Liveness check.

/// Handler for GET /health
///
/// Returns "OK" while the process is serving. Does not check Redis or the
/// database; a dependency outage shows up as 503s on the real endpoints.
pub async fn health_check() -> &'static str {
    "OK"
}
