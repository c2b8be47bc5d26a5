//! Redis store implementation

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use parking_lot::RwLock as SyncRwLock;
use redis::{AsyncCommands, Value};
use std::sync::Arc;
use std::time::Duration;

use skp_delivery_cache_core::{
    CacheError, CacheStore, DependencyStore, EntryOptions, Expiration, Result, StoreStats,
    StoredEntry,
};

use super::config::RedisConfig;

/// Redis TTLs are integral milliseconds; anything smaller rounds up to 1ms
/// so a tiny window never turns into an immediate deletion.
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

/// Distributed cache store backed by Redis
///
/// Redis holds only serialized bytes, so there is no live trigger wiring:
/// dependency membership is tracked in `__deps__:{name}` sets populated at
/// write time, and trigger state lives in ordinary entries the registry
/// stores without a TTL. Cross-process invalidation is detected by the
/// manager's read-repair, not by this store.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
    stats: Arc<SyncRwLock<StoreStats>>,
}

impl RedisStore {
    /// Create a new Redis store
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            config,
            stats: Arc::new(SyncRwLock::new(StoreStats::default())),
        })
    }

    /// Get prefix for a key
    fn prefixed_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Get dependency set key
    fn dep_key(&self, name: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:__deps__:{}", prefix, name),
            None => format!("__deps__:{}", name),
        }
    }

    /// Get connection from pool
    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn try_get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        let bytes: Option<Vec<u8>> = conn
            .get(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        let Some(data) = bytes else {
            self.stats.write().misses += 1;
            return Ok(None);
        };

        let mut entry: StoredEntry = match serde_json::from_slice(&data) {
            Ok(entry) => entry,
            Err(e) => {
                // Corrupt or incompatible payload: degrade to a miss.
                tracing::debug!(key, error = %e, "dropping undecodable entry");
                let _: u64 = conn
                    .unlink(&prefixed)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                self.stats.write().misses += 1;
                return Ok(None);
            }
        };

        // Redis TTLs handle expiry, but a sliding window has to be
        // re-armed on every read.
        if let Expiration::Sliding(window) = entry.expiration {
            let _: bool = conn
                .pexpire(&prefixed, ttl_millis(window) as i64)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
        }
        entry.touch();

        self.stats.write().hits += 1;
        Ok(Some(entry))
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<StoredEntry> {
        let mut conn = self.get_connection().await?;

        let entry = StoredEntry::new(value, options);
        let serialized =
            serde_json::to_vec(&entry).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let prefixed = self.prefixed_key(key);

        // Pipeline so the entry and its dependency-set membership land
        // together.
        let mut pipe = redis::pipe();
        pipe.atomic();

        match entry.expiration.ttl_hint() {
            Some(ttl) => {
                pipe.pset_ex(&prefixed, &serialized, ttl_millis(ttl));
            }
            // NeverEvict/Never entries get no TTL at all.
            None => {
                pipe.set(&prefixed, &serialized);
            }
        }

        for dep in &options.dependencies {
            pipe.sadd(self.dep_key(&dep.name), &prefixed);
        }

        pipe.query_async::<Vec<Value>>(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        self.stats.write().writes += 1;
        Ok(entry)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        let removed: bool = conn
            .unlink(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        if removed {
            self.stats.write().removals += 1;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;

        let match_pattern = match &self.config.key_prefix {
            Some(prefix) => format!("{}:*", prefix),
            None => "*".to_string(),
        };

        // Scan and unlink everything under the prefix. With no prefix the
        // pattern matches the whole database, entries other applications
        // wrote included; see `RedisConfig::key_prefix`.
        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            if !keys.is_empty() {
                let _: usize = conn
                    .unlink(&keys)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let mut stats = self.stats.read().clone();
        stats.size = self.len().await?;
        Ok(stats)
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.get_connection().await?;
        // DBSIZE counts the whole database; with a shared database and a
        // key prefix this is an upper bound.
        let size: usize = redis::cmd("DBSIZE")
            .query_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(size)
    }
}

#[async_trait]
impl DependencyStore for RedisStore {
    async fn evict_dependents(&self, name: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        let dep_k = self.dep_key(name);

        let members: Vec<String> = conn
            .smembers(&dep_k)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        let mut count = 0u64;
        if !members.is_empty() {
            // Members are stored pre-prefixed; ghost members (keys that
            // already expired) just contribute zero to the count.
            count = conn
                .unlink(&members)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
        }

        let _: u64 = conn
            .unlink(&dep_k)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        self.stats.write().evictions += count;
        tracing::debug!(dependency = name, evicted = count, "dependents evicted");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skp_delivery_cache_core::EntryOpts;

    #[test]
    fn test_ttl_millis_keeps_subsecond_windows() {
        assert_eq!(ttl_millis(Duration::from_millis(500)), 500);
        assert_eq!(ttl_millis(Duration::from_millis(2_500)), 2_500);
        // A degenerate window must still outlive the write.
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::ZERO), 1);
    }

    async fn store(prefix: &str) -> RedisStore {
        RedisStore::new(RedisConfig::new("redis://127.0.0.1:6379").prefix(prefix))
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_subsecond_sliding_window_survives_reads() {
        let store = store("ttl-sliding").await;
        let options = EntryOpts::new()
            .sliding(Duration::from_millis(500))
            .build();
        store.set("slider", b"v".to_vec(), &options).await.unwrap();

        // Each read re-arms a 500ms window; none of them may expire the key.
        for _ in 0..3 {
            assert!(store.try_get("slider").await.unwrap().is_some());
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_subsecond_absolute_window_expires_on_time() {
        let store = store("ttl-absolute").await;
        let options = EntryOpts::new()
            .absolute(Duration::from_millis(100))
            .build();
        store.set("stale", b"v".to_vec(), &options).await.unwrap();

        assert!(store.try_get("stale").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.try_get("stale").await.unwrap().is_none());
    }
}
