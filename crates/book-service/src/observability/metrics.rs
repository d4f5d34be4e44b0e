//! Metrics definitions for the book service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `bs_` prefix for the book service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `result`: fixed per metric (see each function)
//! - `operation`: create, update, delete
//! - `endpoint`: normalized to the route template
//!
//! Category ids are never used as labels.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record one category existence check.
///
/// Metric: `bs_reference_checks_total`, `bs_reference_check_duration_seconds`
/// Labels: `result` (exists, missing, unavailable, deadline)
pub fn record_reference_check(result: &str, duration: Duration) {
    histogram!("bs_reference_check_duration_seconds", "result" => result.to_string())
        .record(duration.as_secs_f64());

    counter!("bs_reference_checks_total", "result" => result.to_string()).increment(1);
}

/// Record a book write attempt.
///
/// Metric: `bs_book_mutations_total`
/// Labels: `operation`, `result` (success, invalid, reference_not_found,
/// not_found, unavailable, error)
pub fn record_book_mutation(operation: &str, result: &str) {
    counter!("bs_book_mutations_total",
        "operation" => operation.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record one read-through cache lookup.
///
/// Metric: `bs_cache_lookups_total`
/// Labels: `kind` (book, page), `result` (hit, miss, bypass)
pub fn record_cache_lookup(kind: &str, result: &str) {
    counter!("bs_cache_lookups_total",
        "kind" => kind.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record HTTP request completion.
///
/// Metric: `bs_http_requests_total`, `bs_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(endpoint);

    histogram!("bs_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.clone()
    )
    .record(duration.as_secs_f64());

    counter!("bs_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/v1/books" | "/api/v1/books/search" => path.to_string(),
        p if p.starts_with("/api/v1/books/") => "/api/v1/books/{id}".to_string(),
        _ => "other".to_string(),
    }
}
