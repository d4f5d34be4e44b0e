//! Metrics definitions for the API gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gw_` prefix for the gateway
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `result`: allowed, rejected, forbidden, unavailable, timeout
//! - `upstream`: users, books, categories
//! - `status`: HTTP status code of the upstream response, or `error`
//! - `endpoint`: normalized to a route template

use metrics::{counter, histogram};
use std::time::Duration;

/// Record an authentication gate decision.
///
/// Metric: `gw_auth_decisions_total`, `gw_auth_duration_seconds`
pub fn record_auth_decision(result: &str, duration: Duration) {
    histogram!("gw_auth_duration_seconds", "result" => result.to_string())
        .record(duration.as_secs_f64());
    counter!("gw_auth_decisions_total", "result" => result.to_string()).increment(1);
}

/// Record a forwarded request.
///
/// Metric: `gw_upstream_requests_total`, `gw_upstream_duration_seconds`
pub fn record_upstream_request(upstream: &str, status: &str, duration: Duration) {
    histogram!("gw_upstream_duration_seconds", "upstream" => upstream.to_string())
        .record(duration.as_secs_f64());
    counter!("gw_upstream_requests_total",
        "upstream" => upstream.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request completion.
///
/// Metric: `gw_http_requests_total`, `gw_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(endpoint);

    histogram!("gw_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.clone()
    )
    .record(duration.as_secs_f64());

    counter!("gw_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health"
        | "/metrics"
        | "/api/v1/me"
        | "/api/v1/auth/register"
        | "/api/v1/auth/login"
        | "/api/v1/auth/logout"
        | "/api/v1/users"
        | "/api/v1/books"
        | "/api/v1/books/search"
        | "/api/v1/categories" => path.to_string(),
        p if p.starts_with("/api/v1/users/") => "/api/v1/users/{id}".to_string(),
        p if p.starts_with("/api/v1/books/") => "/api/v1/books/{id}".to_string(),
        p if p.starts_with("/api/v1/categories/") => "/api/v1/categories/{id}".to_string(),
        _ => "other".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        record_auth_decision("allowed", Duration::from_millis(4));
        record_auth_decision("unavailable", Duration::from_millis(2000));
        record_upstream_request("books", "201", Duration::from_millis(12));
        record_upstream_request("categories", "error", Duration::from_millis(10));
        record_http_request("DELETE", "/api/v1/books/42", 403, Duration::from_millis(1));
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/api/v1/books"), "/api/v1/books");
        assert_eq!(normalize_endpoint("/api/v1/books/abc"), "/api/v1/books/{id}");
        assert_eq!(normalize_endpoint("/api/v1/books/search"), "/api/v1/books/search");
        assert_eq!(normalize_endpoint("/api/v1/users"), "/api/v1/users");
        assert_eq!(normalize_endpoint("/api/v1/categories/c-1"), "/api/v1/categories/{id}");
        assert_eq!(normalize_endpoint("/api/v1/auth/login"), "/api/v1/auth/login");
        assert_eq!(normalize_endpoint("/api/v1/auth/anything"), "other");
        assert_eq!(normalize_endpoint("/.env"), "other");
    }
}
