//! Book service configuration.

use common::config::{bounded_u64, required, timeout_ms};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Per-call timeout for one category existence check.
pub const DEFAULT_CATEGORY_LOOKUP_TIMEOUT_MS: u64 = 2000;

pub const DEFAULT_MAX_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Lifetime of a cached book or page.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 1800;

pub const DEFAULT_REDIS_OP_TIMEOUT_MS: u64 = 500;

const MAX_TIMEOUT_MS: u64 = 120_000;

pub struct Config {
    pub database_url: SecretString,
    pub category_service_url: String,
    pub bind_address: String,
    pub category_lookup_timeout: Duration,
    /// Upper bound for the per-request deadline accepted from callers.
    pub max_request_timeout: Duration,
    /// Read-through cache; unset runs without one.
    pub redis_url: Option<SecretString>,
    pub cache_ttl: Duration,
    pub redis_op_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("category_service_url", &self.category_service_url)
            .field("bind_address", &self.bind_address)
            .field("category_lookup_timeout", &self.category_lookup_timeout)
            .field("max_request_timeout", &self.max_request_timeout)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("cache_ttl", &self.cache_ttl)
            .field("redis_op_timeout", &self.redis_op_timeout)
            .finish()
    }
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
        let database_url = required(vars, "DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let category_service_url = required(vars, "CATEGORY_SERVICE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("CATEGORY_SERVICE_URL".to_string()))?
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !category_service_url.starts_with("http://")
            && !category_service_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue(format!(
                "CATEGORY_SERVICE_URL must be an http(s) URL, got '{category_service_url}'"
            )));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let category_lookup_timeout = timeout_ms(
            vars,
            "CATEGORY_LOOKUP_TIMEOUT_MS",
            DEFAULT_CATEGORY_LOOKUP_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )
        .map_err(ConfigError::InvalidValue)?;

        let max_request_timeout = timeout_ms(
            vars,
            "MAX_REQUEST_TIMEOUT_MS",
            DEFAULT_MAX_REQUEST_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )
        .map_err(ConfigError::InvalidValue)?;

        let redis_url = required(vars, "REDIS_URL").map(|url| SecretString::from(url.to_string()));

        let cache_ttl = bounded_u64(vars, "CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS, 1, 86_400)
            .map(Duration::from_secs)
            .map_err(ConfigError::InvalidValue)?;

        let redis_op_timeout = timeout_ms(
            vars,
            "REDIS_OP_TIMEOUT_MS",
            DEFAULT_REDIS_OP_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )
        .map_err(ConfigError::InvalidValue)?;

        Ok(Config {
            database_url: SecretString::from(database_url.to_string()),
            category_service_url,
            bind_address,
            category_lookup_timeout,
            max_request_timeout,
            redis_url,
            cache_ttl,
            redis_op_timeout,
        })
    }
}
