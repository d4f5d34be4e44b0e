//! Read-through cache for the catalogue services.
//!
//! The database stays the source of truth. A cache that is down, slow or
//! holding garbage is a miss, never an error seen by the caller.
//!
//! # Key Pattern
//!
//! - `{namespace}:generation` - counter bumped by every write
//! - `{namespace}:g{generation}:{suffix}` - JSON value, expires after the TTL
//!
//! Invalidation is one `INCR`. Entries written under an older generation are
//! never read again and age out on their own, so a reader that loaded stale
//! rows before a concurrent write cannot publish them to later readers.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache {op} failed: {reason}")]
    Backend { op: &'static str, reason: String },

    #[error("cache {op} timed out")]
    Timeout { op: &'static str },
}

/// Raw string storage behind [`ReadThroughCache`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Atomically add one and return the new value. A missing key counts
    /// from zero.
    async fn incr(&self, key: &str) -> Result<u64, CacheError>;
}

/// Redis-backed store over one multiplexed connection.
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: MultiplexedConnection,
    op_timeout: Duration,
}

impl RedisCacheStore {
    /// # Errors
    ///
    /// Returns [`CacheError`] if the client cannot be opened or the first
    /// connection does not succeed within `op_timeout`.
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        // Do not log redis_url; it may carry credentials.
        let client = Client::open(redis_url).map_err(|e| CacheError::Backend {
            op: "open",
            reason: e.to_string(),
        })?;

        let connection = tokio::time::timeout(op_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout { op: "connect" })?
            .map_err(|e| {
                error!(target: "common.cache", error = %e, "Failed to connect to Redis");
                CacheError::Backend {
                    op: "connect",
                    reason: e.to_string(),
                }
            })?;

        Ok(Self {
            connection,
            op_timeout,
        })
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::Backend {
                op,
                reason: e.to_string(),
            }),
            Err(_) => Err(CacheError::Timeout { op }),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        self.bounded("get", conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        self.bounded("set", conn.set_ex::<_, _, ()>(key, value, seconds))
            .await
    }

    async fn incr(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection.clone();
        self.bounded("incr", conn.incr::<_, _, u64>(key, 1u64)).await
    }
}

/// Process-local store with the same semantics as the Redis one.
///
/// Expiry uses tokio's clock. [`InMemoryCacheStore::set_available`] turns
/// the store into one that fails every call.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, (String, Option<Instant>)>>,
    unavailable: AtomicBool,
}

impl InMemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of unexpired entries, generation counters included.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| expires_at.map_or(true, |at| at > now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check(&self, op: &'static str) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Backend {
                op,
                reason: "store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check("get")?;
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|(_, expires_at)| expires_at.map_or(true, |at| at > now))
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check("set")?;
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| expires_at.map_or(true, |at| at > now));
        entries.insert(key.to_string(), (value.to_string(), Some(now + ttl)));
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<u64, CacheError> {
        self.check("incr")?;
        let mut entries = self.entries.write().await;
        let next = entries
            .get(key)
            .and_then(|(value, _)| value.parse::<u64>().ok())
            .unwrap_or(0)
            .saturating_add(1);
        entries.insert(key.to_string(), (next.to_string(), None));
        Ok(next)
    }
}

/// What a lookup did, for metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    /// The store could not be consulted; the value came from the loader.
    Bypass,
}

impl CacheOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Bypass => "bypass",
        }
    }
}

/// Typed, namespaced view over a [`CacheStore`].
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    ttl: Duration,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            ttl,
        }
    }

    fn generation_key(&self) -> String {
        format!("{}:generation", self.namespace)
    }

    async fn generation(&self) -> Option<u64> {
        match self.store.get(&self.generation_key()).await {
            Ok(raw) => Some(raw.and_then(|v| v.parse().ok()).unwrap_or(0)),
            Err(e) => {
                warn!(target: "common.cache", namespace = %self.namespace, error = %e, "Cache generation unavailable");
                None
            }
        }
    }

    /// Return the cached value for `suffix`, or run `load` and cache what it
    /// finds. `Ok(None)` from the loader is passed through and not cached.
    ///
    /// # Errors
    ///
    /// Only the loader's errors; cache failures fall through to `load`.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        suffix: &str,
        load: F,
    ) -> Result<(Option<T>, CacheOutcome), E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let Some(generation) = self.generation().await else {
            return Ok((load().await?, CacheOutcome::Bypass));
        };
        let key = format!("{}:g{generation}:{suffix}", self.namespace);

        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => return Ok((Some(value), CacheOutcome::Hit)),
                Err(e) => {
                    warn!(target: "common.cache", namespace = %self.namespace, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(target: "common.cache", namespace = %self.namespace, error = %e, "Cache read failed");
                return Ok((load().await?, CacheOutcome::Bypass));
            }
        }

        let loaded = load().await?;
        if let Some(value) = &loaded {
            match serde_json::to_string(value) {
                Ok(raw) => {
                    if let Err(e) = self.store.set(&key, &raw, self.ttl).await {
                        warn!(target: "common.cache", namespace = %self.namespace, error = %e, "Cache write failed");
                    }
                }
                Err(e) => {
                    warn!(target: "common.cache", namespace = %self.namespace, error = %e, "Failed to encode cache entry");
                }
            }
        }
        Ok((loaded, CacheOutcome::Miss))
    }

    /// Drop every entry in this namespace. Call after each committed write.
    ///
    /// A failure is logged; entries then live until their TTL.
    pub async fn invalidate(&self) {
        match self.store.incr(&self.generation_key()).await {
            Ok(generation) => {
                debug!(target: "common.cache", namespace = %self.namespace, generation, "Cache invalidated");
            }
            Err(e) => {
                error!(target: "common.cache", namespace = %self.namespace, error = %e, "Cache invalidation failed; entries live until TTL");
            }
        }
    }
}
