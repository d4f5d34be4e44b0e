//! Metrics definitions for the user service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `us_` prefix for the user service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `result`: fixed per metric (see each function)
//! - `reason`: bounded by `TokenError` variants plus `revoked`, `subject_mismatch`
//! - `endpoint`: normalized to the route template

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a login attempt.
///
/// Metric: `us_logins_total`
/// Labels: `result` (success, invalid_credentials, unavailable, error)
pub fn record_login(result: &str) {
    counter!("us_logins_total", "result" => result.to_string()).increment(1);
}

/// Record a logout.
///
/// Metric: `us_logouts_total`
/// Labels: `result` (success, error)
pub fn record_logout(result: &str) {
    counter!("us_logouts_total", "result" => result.to_string()).increment(1);
}

/// Record a user registration.
///
/// Metric: `us_registrations_total`
/// Labels: `result` (success, conflict, invalid, error)
pub fn record_registration(result: &str) {
    counter!("us_registrations_total", "result" => result.to_string()).increment(1);
}

/// Record an account update or deletion.
///
/// Metric: `us_account_mutations_total`
/// Labels: `operation` (update, delete), `result` (success, not_found, conflict, invalid, unavailable, error)
pub fn record_account_mutation(operation: &str, result: &str) {
    counter!("us_account_mutations_total",
        "operation" => operation.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a session validation decision and its latency.
///
/// Metric: `us_session_validations_total`, `us_session_validation_duration_seconds`
/// Labels: `result` (valid, invalid, unavailable), `reason`
pub fn record_session_validation(result: &str, reason: &str, duration: Duration) {
    histogram!("us_session_validation_duration_seconds", "result" => result.to_string())
        .record(duration.as_secs_f64());

    counter!("us_session_validations_total",
        "result" => result.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record HTTP request completion.
///
/// Metric: `us_http_requests_total`, `us_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(endpoint);

    histogram!("us_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.clone()
    )
    .record(duration.as_secs_f64());

    counter!("us_http_requests_total",
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
        | "/api/v1/auth/register"
        | "/api/v1/auth/login"
        | "/api/v1/auth/logout"
        | "/api/v1/users"
        | "/internal/v1/sessions/validate" => path.to_string(),
        p if p.starts_with("/api/v1/users/") => "/api/v1/users/{id}".to_string(),
        _ => "other".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No recorder is installed in unit tests; these exercise the calls
    // against the global no-op recorder.

    #[test]
    fn test_record_functions_do_not_panic() {
        record_login("success");
        record_login("invalid_credentials");
        record_logout("success");
        record_registration("conflict");
        record_account_mutation("delete", "unavailable");
        record_session_validation("valid", "none", Duration::from_millis(3));
        record_session_validation("unavailable", "registry", Duration::from_millis(1000));
        record_http_request("POST", "/api/v1/auth/login", 200, Duration::from_millis(40));
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/api/v1/auth/login"), "/api/v1/auth/login");
        assert_eq!(
            normalize_endpoint("/api/v1/users/6a0e6f1c-1111-4000-8000-000000000001"),
            "/api/v1/users/{id}"
        );
        assert_eq!(normalize_endpoint("/api/v1/users"), "/api/v1/users");
        assert_eq!(normalize_endpoint("/wp-admin"), "other");
    }
}
