//! User service configuration.
//!
//! Loaded from environment variables. Connection URLs and the signing key
//! are held as secrets and redacted in Debug output.

use base64::{engine::general_purpose, Engine as _};
use common::config::{bounded_u64, required, timeout_ms};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::{SecretBox, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8082";

/// Session lifetime; also the registry TTL for each login.
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 3600;
pub const MIN_TOKEN_TTL_SECONDS: u64 = 60;
pub const MAX_TOKEN_TTL_SECONDS: u64 = 86_400;

pub const DEFAULT_BCRYPT_COST: u32 = 12;
pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 14;

pub const DEFAULT_REDIS_OP_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_MAX_REQUEST_TIMEOUT_MS: u64 = 30_000;

const MAX_TIMEOUT_MS: u64 = 120_000;

pub struct Config {
    pub database_url: SecretString,
    pub redis_url: SecretString,
    pub bind_address: String,
    /// Ed25519 private key, PKCS#8 DER.
    pub signing_key: SecretBox<Vec<u8>>,
    pub token_ttl: Duration,
    pub jwt_clock_skew: Duration,
    pub bcrypt_cost: u32,
    pub redis_op_timeout: Duration,
    /// Upper bound for the per-request deadline accepted from callers.
    pub max_request_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("signing_key", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("jwt_clock_skew", &self.jwt_clock_skew)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("redis_op_timeout", &self.redis_op_timeout)
            .field("max_request_timeout", &self.max_request_timeout)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),

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

        let redis_url = required(vars, "REDIS_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let signing_key_b64 = required(vars, "USER_SIGNING_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("USER_SIGNING_KEY".to_string()))?;
        let signing_key = general_purpose::STANDARD
            .decode(signing_key_b64.trim())
            .map_err(|e| ConfigError::InvalidSigningKey(format!("not valid base64: {e}")))?;
        if signing_key.is_empty() {
            return Err(ConfigError::InvalidSigningKey("key is empty".to_string()));
        }

        let token_ttl = bounded_u64(
            vars,
            "TOKEN_TTL_SECONDS",
            DEFAULT_TOKEN_TTL_SECONDS,
            MIN_TOKEN_TTL_SECONDS,
            MAX_TOKEN_TTL_SECONDS,
        )
        .map(Duration::from_secs)
        .map_err(ConfigError::InvalidValue)?;

        let jwt_clock_skew = bounded_u64(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW.as_secs(),
            0,
            MAX_CLOCK_SKEW.as_secs(),
        )
        .map(Duration::from_secs)
        .map_err(ConfigError::InvalidValue)?;

        let bcrypt_cost = bounded_u64(
            vars,
            "BCRYPT_COST",
            u64::from(DEFAULT_BCRYPT_COST),
            u64::from(MIN_BCRYPT_COST),
            u64::from(MAX_BCRYPT_COST),
        )
        .map_err(ConfigError::InvalidValue)?;
        // Bounded by MAX_BCRYPT_COST above.
        let bcrypt_cost = u32::try_from(bcrypt_cost).unwrap_or(DEFAULT_BCRYPT_COST);

        let redis_op_timeout = timeout_ms(
            vars,
            "REDIS_OP_TIMEOUT_MS",
            DEFAULT_REDIS_OP_TIMEOUT_MS,
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

        Ok(Config {
            database_url: SecretString::from(database_url.to_string()),
            redis_url: SecretString::from(redis_url.to_string()),
            bind_address,
            signing_key: SecretBox::new(Box::new(signing_key)),
            token_ttl,
            jwt_clock_skew,
            bcrypt_cost,
            redis_op_timeout,
            max_request_timeout,
        })
    }
}
