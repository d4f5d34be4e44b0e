//! API gateway configuration.
//!
//! Loaded from environment variables. No secrets live here; the gateway
//! never holds signing keys or database credentials.

use common::config::{required, timeout_ms};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Per-call timeout for the session validation request.
pub const DEFAULT_SESSION_VALIDATE_TIMEOUT_MS: u64 = 2000;

/// Per-call timeout for a forwarded request.
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;

/// Total budget for one client request, propagated downstream.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

const MAX_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub user_service_url: String,
    pub book_service_url: String,
    pub category_service_url: String,
    pub session_validate_timeout: Duration,
    pub upstream_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let user_service_url = service_url(vars, "USER_SERVICE_URL")?;
        let book_service_url = service_url(vars, "BOOK_SERVICE_URL")?;
        let category_service_url = service_url(vars, "CATEGORY_SERVICE_URL")?;

        let session_validate_timeout = timeout_ms(
            vars,
            "SESSION_VALIDATE_TIMEOUT_MS",
            DEFAULT_SESSION_VALIDATE_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )
        .map_err(ConfigError::InvalidValue)?;

        let upstream_timeout = timeout_ms(
            vars,
            "UPSTREAM_TIMEOUT_MS",
            DEFAULT_UPSTREAM_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )
        .map_err(ConfigError::InvalidValue)?;

        let request_timeout = timeout_ms(
            vars,
            "REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )
        .map_err(ConfigError::InvalidValue)?;

        Ok(Config {
            bind_address,
            user_service_url,
            book_service_url,
            category_service_url,
            session_validate_timeout,
            upstream_timeout,
            request_timeout,
        })
    }
}

/// Base URL of a downstream service, without a trailing slash.
fn service_url(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    let url = required(vars, name)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?
        .trim()
        .trim_end_matches('/');

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be an http(s) URL, got '{url}'"
        )));
    }
    Ok(url.to_string())
}
