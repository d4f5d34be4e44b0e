//! Liveness check.

/// Handler for GET /health
///
/// The gateway holds no state of its own, so liveness is just "serving".
pub async fn health_check() -> &'static str {
    "OK"
}
