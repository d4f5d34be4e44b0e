//! Metrics definitions for the category service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `cs_` prefix for the category service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! Category ids are never used as labels.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a category write attempt.
///
/// Metric: `cs_category_mutations_total`
/// Labels: `operation` (create, update, delete), `result` (success, invalid,
/// not_found, conflict, error)
pub fn record_category_mutation(operation: &str, result: &str) {
    counter!("cs_category_mutations_total",
        "operation" => operation.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record one read-through cache lookup.
///
/// Metric: `cs_cache_lookups_total`
/// Labels: `kind` (category, page), `result` (hit, miss, bypass)
pub fn record_cache_lookup(kind: &str, result: &str) {
    counter!("cs_cache_lookups_total",
        "kind" => kind.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record HTTP request completion.
///
/// Metric: `cs_http_requests_total`, `cs_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(endpoint);

    histogram!("cs_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.clone()
    )
    .record(duration.as_secs_f64());

    counter!("cs_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/v1/categories" => path.to_string(),
        p if p.starts_with("/api/v1/categories/") => "/api/v1/categories/{id}".to_string(),
        _ => "other".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        record_category_mutation("create", "conflict");
        record_cache_lookup("category", "miss");
        record_http_request("GET", "/api/v1/categories/cat-a", 404, Duration::from_millis(2));
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/api/v1/categories"), "/api/v1/categories");
        assert_eq!(normalize_endpoint("/api/v1/categories/cat-scifi"), "/api/v1/categories/{id}");
        assert_eq!(normalize_endpoint("/api/v1/books"), "other");
    }
}
