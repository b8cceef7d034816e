//! Instance cache
//!
//! A time-bounded key-value cache in front of the store. Values are
//! serialized JSON strings; the cache knows nothing about their shape.

use async_trait::async_trait;
use std::time::Duration;

use crate::CoreError;

/// Key-value cache with per-entry expiry
#[async_trait]
pub trait InstanceCache: Send + Sync {
    /// Get a live entry
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Set an entry that expires after `ttl`
    async fn set_with_expiry(&self, key: &str, value: String, ttl: Duration)
        -> Result<(), CoreError>;

    /// Remove an entry; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), CoreError>;
}

/// In-process cache, used by tests and the single-process binary
#[cfg(feature = "testing")]
pub mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::Arc;
    use std::time::Instant;
    use tracing::debug;

    #[derive(Debug, Clone)]
    struct CacheEntry {
        value: String,
        expires_at: Instant,
    }

    impl CacheEntry {
        fn is_expired(&self) -> bool {
            Instant::now() >= self.expires_at
        }
    }

    /// In-memory implementation of [`InstanceCache`] with lazy expiry
    #[derive(Clone, Default)]
    pub struct InMemoryInstanceCache {
        entries: Arc<DashMap<String, CacheEntry>>,
    }

    impl InMemoryInstanceCache {
        /// Create an empty cache
        pub fn new() -> Self {
            Self::default()
        }

        /// Drop every expired entry, returning how many were removed
        pub fn purge_expired(&self) -> usize {
            let before = self.entries.len();
            self.entries.retain(|_, entry| !entry.is_expired());
            let removed = before.saturating_sub(self.entries.len());
            if removed > 0 {
                debug!(removed, "Purged expired cache entries");
            }
            removed
        }

        /// Number of stored entries, expired ones included
        pub fn len(&self) -> usize {
            self.entries.len()
        }

        /// Whether the cache holds no entries
        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }
    }

    #[async_trait]
    impl InstanceCache for InMemoryInstanceCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
            let expired = match self.entries.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => true,
                None => false,
            };
            if expired {
                self.entries.remove(key);
            }
            Ok(None)
        }

        async fn set_with_expiry(
            &self,
            key: &str,
            value: String,
            ttl: Duration,
        ) -> Result<(), CoreError> {
            self.entries.insert(
                key.to_string(),
                CacheEntry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CoreError> {
            self.entries.remove(key);
            Ok(())
        }
    }

}

/// Redis-backed cache
#[cfg(feature = "redis")]
pub mod redis {
    use super::*;
    use ::redis::aio::ConnectionManager;
    use ::redis::AsyncCommands;
    use tracing::{debug, info};

    /// [`InstanceCache`] over a shared Redis connection
    #[derive(Clone)]
    pub struct RedisInstanceCache {
        connection: ConnectionManager,
    }

    impl RedisInstanceCache {
        /// Connect to the Redis server at `redis_url`
        pub async fn connect(redis_url: &str) -> Result<Self, CoreError> {
            info!("Connecting instance cache to Redis at {}", redis_url);
            let client = ::redis::Client::open(redis_url)
                .map_err(|e| CoreError::CacheError(format!("Invalid Redis URL: {}", e)))?;
            let connection = ConnectionManager::new(client)
                .await
                .map_err(|e| CoreError::CacheError(format!("Redis connection error: {}", e)))?;
            Ok(Self { connection })
        }
    }

    #[async_trait]
    impl InstanceCache for RedisInstanceCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
            let mut conn = self.connection.clone();
            conn.get(key)
                .await
                .map_err(|e| CoreError::CacheError(format!("Redis get error: {}", e)))
        }

        async fn set_with_expiry(
            &self,
            key: &str,
            value: String,
            ttl: Duration,
        ) -> Result<(), CoreError> {
            let mut conn = self.connection.clone();
            // Redis expiry has second granularity; never let an entry live forever
            let ttl_seconds = ttl.as_secs().max(1) as usize;
            conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
                .await
                .map_err(|e| CoreError::CacheError(format!("Redis setex error: {}", e)))?;
            debug!(key, ttl_seconds, "Set Redis cache entry");
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CoreError> {
            let mut conn = self.connection.clone();
            conn.del::<_, ()>(key)
                .await
                .map_err(|e| CoreError::CacheError(format!("Redis delete error: {}", e)))?;
            debug!(key, "Deleted Redis cache entry");
            Ok(())
        }
    }
}
