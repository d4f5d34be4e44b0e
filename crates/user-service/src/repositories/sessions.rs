//! Session registry: the revocable record of which tokens are live.
//!
//! A token is valid only while its record exists here. Records expire with
//! the token's lifetime and are deleted on logout.
//!
//! # Key Pattern
//!
//! - `session:{digest}` -> subject id, where `digest` is the base64url
//!   SHA-256 of the token. Raw bearer values never reach Redis.
//! - `session_subject:{subject_id}` -> set of that subject's session keys,
//!   expiring with the newest session. Used to revoke every session of a
//!   deleted account.

use crate::errors::UsError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use ring::digest::{digest, SHA256};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Record `token` as live for `subject_id` until `ttl` elapses.
    /// Overwrites any existing record for the same token.
    async fn put(&self, token: &str, subject_id: &str, ttl: Duration) -> Result<(), UsError>;

    /// Subject id for a live token. Never-issued, expired and revoked tokens
    /// all resolve to `None`.
    async fn resolve(&self, token: &str) -> Result<Option<String>, UsError>;

    /// Remove the record. Revoking an absent token succeeds.
    async fn revoke(&self, token: &str) -> Result<(), UsError>;

    /// Remove every record for `subject_id`. Returns how many were live.
    async fn revoke_subject(&self, subject_id: &str) -> Result<u64, UsError>;
}

fn session_key(token: &str) -> String {
    let hash = digest(&SHA256, token.as_bytes());
    format!("session:{}", URL_SAFE_NO_PAD.encode(hash.as_ref()))
}

fn subject_index_key(subject_id: &str) -> String {
    format!("session_subject:{subject_id}")
}

/// Redis-backed registry.
///
/// `MultiplexedConnection` is cheap to clone and safe to use concurrently,
/// so each operation clones it instead of locking.
#[derive(Clone)]
pub struct RedisSessionRegistry {
    connection: MultiplexedConnection,
    op_timeout: Duration,
}

impl RedisSessionRegistry {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `UsError::ServiceUnavailable` if the client cannot be opened
    /// or the initial connection fails.
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self, UsError> {
        // Do not log redis_url; it may carry credentials.
        let client = Client::open(redis_url).map_err(|e| {
            error!(target: "us.repositories.sessions", error = %e, "Failed to open Redis client");
            UsError::ServiceUnavailable(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = tokio::time::timeout(op_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| UsError::ServiceUnavailable("Timed out connecting to Redis".to_string()))?
            .map_err(|e| {
                error!(target: "us.repositories.sessions", error = %e, "Failed to connect to Redis");
                UsError::ServiceUnavailable(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            op_timeout,
        })
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, UsError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(target: "us.repositories.sessions", error = %e, op, "Redis operation failed");
                Err(UsError::ServiceUnavailable(format!("Redis {op} failed: {e}")))
            }
            Err(_) => {
                warn!(target: "us.repositories.sessions", op, timeout_ms = self.op_timeout.as_millis() as u64, "Redis operation timed out");
                Err(UsError::ServiceUnavailable(format!("Redis {op} timed out")))
            }
        }
    }
}

#[async_trait]
impl SessionRegistry for RedisSessionRegistry {
    #[instrument(skip_all, name = "us.sessions.put")]
    async fn put(&self, token: &str, subject_id: &str, ttl: Duration) -> Result<(), UsError> {
        let mut conn = self.connection.clone();
        let key = session_key(token);
        let index = subject_index_key(subject_id);
        // SET EX rejects 0; a sub-second ttl still gets one second.
        let seconds = ttl.as_secs().max(1);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set_ex(&key, subject_id, seconds)
            .ignore()
            .sadd(&index, &key)
            .ignore()
            .expire(&index, i64::try_from(seconds).unwrap_or(i64::MAX))
            .ignore();
        self.bounded("put", pipe.query_async::<()>(&mut conn))
            .await?;
        debug!(target: "us.repositories.sessions", ttl_secs = seconds, "Session recorded");
        Ok(())
    }

    #[instrument(skip_all, name = "us.sessions.resolve")]
    async fn resolve(&self, token: &str) -> Result<Option<String>, UsError> {
        let mut conn = self.connection.clone();
        let key = session_key(token);
        self.bounded("resolve", conn.get::<_, Option<String>>(&key)).await
    }

    #[instrument(skip_all, name = "us.sessions.revoke")]
    async fn revoke(&self, token: &str) -> Result<(), UsError> {
        let mut conn = self.connection.clone();
        let key = session_key(token);
        let removed: u64 = self.bounded("revoke", conn.del(&key)).await?;
        debug!(target: "us.repositories.sessions", removed, "Session revoked");
        Ok(())
    }

    #[instrument(skip_all, name = "us.sessions.revoke_subject")]
    async fn revoke_subject(&self, subject_id: &str) -> Result<u64, UsError> {
        let mut conn = self.connection.clone();
        let index = subject_index_key(subject_id);
        let keys: Vec<String> = self
            .bounded("revoke_subject", conn.smembers(&index))
            .await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in &keys {
            pipe.del(key);
        }
        pipe.del(&index).ignore();
        let removed: Vec<u64> = self
            .bounded("revoke_subject", pipe.query_async(&mut conn))
            .await?;
        let removed = removed.iter().sum();
        debug!(target: "us.repositories.sessions", removed, "Subject sessions revoked");
        Ok(removed)
    }
}

/// Process-local registry with the same semantics as the Redis one.
///
/// Expiry uses tokio's clock so tests can drive it with `time::advance`.
#[derive(Default)]
pub struct InMemorySessionRegistry {
    sessions: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired records.
    pub async fn live_count(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn put(&self, token: &str, subject_id: &str, ttl: Duration) -> Result<(), UsError> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        sessions.insert(
            session_key(token),
            (subject_id.to_string(), now + ttl),
        );
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<Option<String>, UsError> {
        let sessions = self.sessions.read().await;
        let now = Instant::now();
        Ok(sessions
            .get(&session_key(token))
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(subject, _)| subject.clone()))
    }

    async fn revoke(&self, token: &str) -> Result<(), UsError> {
        self.sessions.write().await.remove(&session_key(token));
        Ok(())
    }

    async fn revoke_subject(&self, subject_id: &str) -> Result<u64, UsError> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let mut removed = 0;
        sessions.retain(|_, (subject, expires_at)| {
            if subject == subject_id {
                if *expires_at > now {
                    removed += 1;
                }
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}
