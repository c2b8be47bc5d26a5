//! High-level cache manager

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};

use skp_delivery_cache_core::{
    CacheError, CacheStore, DependencyStore, EntryOptions, EntryPriority, Expiration, Freshness,
    JsonSerializer, Result, Serializer, StoreStats, StoredEntry,
};

mod key_lock;
use key_lock::KeyLockMap;

mod registry;
pub use registry::DependencyRegistry;

/// Configuration for DeliveryCache
#[derive(Debug, Clone)]
pub struct DeliveryCacheConfig {
    /// Sliding expiration for fresh values
    pub default_expiration: Duration,
    /// Absolute expiration for values carrying stale content; shorter than
    /// the default so not-yet-current responses turn over quickly
    pub stale_content_expiration: Duration,
    /// Namespace prefix for all keys
    pub namespace: Option<String>,
}

impl Default for DeliveryCacheConfig {
    fn default() -> Self {
        Self {
            default_expiration: Duration::from_secs(60),
            stale_content_expiration: Duration::from_secs(10),
            namespace: None,
        }
    }
}

impl DeliveryCacheConfig {
    /// Create config with specific expirations
    pub fn with_expirations(default_expiration: Duration, stale_content_expiration: Duration) -> Self {
        Self {
            default_expiration,
            stale_content_expiration,
            ..Default::default()
        }
    }

    /// Create config with namespace
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }
}

/// Dependency-tracked response cache with single-flight population
///
/// Sits in front of expensive fetches: concurrent callers for the same key
/// share one factory invocation, entries expire under a fresh/stale policy
/// decided at population time, and dependency names let one invalidation
/// signal evict every related entry without knowing their keys.
///
/// Generic over:
/// - `B`: The storage flavor (Memory, Redis)
/// - `S`: The serializer (JSON, MessagePack)
pub struct DeliveryCache<B, S = JsonSerializer>
where
    B: CacheStore + DependencyStore,
    S: Serializer,
{
    store: Arc<B>,
    serializer: Arc<S>,
    config: DeliveryCacheConfig,
    key_locks: KeyLockMap,
    registry: DependencyRegistry<B>,
    /// Every namespaced key this manager instance has ever stored; `clear`
    /// is scoped to this list, not the whole backend.
    known_keys: Arc<DashMap<String, ()>>,
}

// Constructors for the default serializer
impl<B: CacheStore + DependencyStore> DeliveryCache<B, JsonSerializer> {
    /// Create a new DeliveryCache with the default JSON serializer
    pub fn new(store: B) -> Self {
        Self::with_config(store, DeliveryCacheConfig::default())
    }

    /// Create with custom config
    pub fn with_config(store: B, config: DeliveryCacheConfig) -> Self {
        Self::with_serializer(store, JsonSerializer, config)
    }
}

impl<B, S> DeliveryCache<B, S>
where
    B: CacheStore + DependencyStore,
    S: Serializer,
{
    /// Create a DeliveryCache with a custom serializer
    pub fn with_serializer(store: B, serializer: S, config: DeliveryCacheConfig) -> Self {
        let store = Arc::new(store);
        Self {
            registry: DependencyRegistry::new(store.clone()),
            store,
            serializer: Arc::new(serializer),
            config,
            key_locks: KeyLockMap::new(),
            known_keys: Arc::new(DashMap::new()),
        }
    }

    /// Get the full key with namespace prefix
    fn full_key(&self, key: &str) -> String {
        match &self.config.namespace {
            Some(ns) => format!("{}:{}", ns, key),
            None => key.to_string(),
        }
    }

    /// Reject null/empty keys before any locking happens
    fn validated_key(&self, key: &str) -> Result<String> {
        if key.trim().is_empty() {
            return Err(CacheError::InvalidKey(
                "cache key must not be empty".to_string(),
            ));
        }
        Ok(self.full_key(key))
    }

    /// Get a cached value, or produce and store it via `factory`
    ///
    /// The produced value is cached under the default expiration policy
    /// with no dependencies; see [`get_or_add_with`](Self::get_or_add_with)
    /// for cacheability and dependency control.
    pub async fn get_or_add<T, F, Fut>(&self, key: &str, factory: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Freshness,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.get_or_add_with(key, factory, |_| true, |_| Vec::new())
            .await
    }

    /// Get a cached value, or produce one and decide how to store it
    ///
    /// On a miss, at most one caller per key runs `factory`; everyone else
    /// waits and observes the stored result. A factory failure propagates
    /// to the caller verbatim, caches nothing, and releases the key lock so
    /// the next caller retries.
    ///
    /// `should_cache` returning false hands the value back WITHOUT caching
    /// it (an error payload arrived, for instance). `dependencies` names
    /// the invalidation groups the value belongs to; each name is resolved
    /// to its canonical trigger and recorded on the entry.
    pub async fn get_or_add_with<T, F, Fut, P, D>(
        &self,
        key: &str,
        factory: F,
        should_cache: P,
        dependencies: D,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Freshness,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: FnOnce(&T) -> bool,
        D: FnOnce(&T) -> Vec<String>,
    {
        let full_key = self.validated_key(key)?;

        // Fast path: lock-free read for the common hit case.
        if let Some(value) = self.lookup(&full_key).await? {
            return Ok(value);
        }

        let lock = self.key_locks.lock_for(&full_key);
        let _guard = lock.lock().await;

        // Re-check: another caller may have finished populating while we
        // waited on the lock.
        if let Some(value) = self.lookup(&full_key).await? {
            tracing::trace!(key = %full_key, "populated while waiting for key lock");
            return Ok(value);
        }

        // Single in-flight producer from here on. A failure propagates
        // unchanged; the guard drop releases the lock either way.
        let value = factory().await?;

        if !should_cache(&value) {
            tracing::debug!(key = %full_key, "factory result not cacheable, returning uncached");
            return Ok(value);
        }

        // Stale content gets the short absolute window; this is decided
        // once and never reassessed.
        let expiration = if value.has_stale_content() {
            Expiration::Absolute(self.config.stale_content_expiration)
        } else {
            Expiration::Sliding(self.config.default_expiration)
        };

        let mut refs = Vec::new();
        for name in dependencies(&value) {
            let trigger = self.registry.resolve(&name).await?;
            refs.push(trigger.entry_ref());
        }

        let options = EntryOptions {
            expiration,
            priority: EntryPriority::Normal,
            dependencies: refs,
        };

        let bytes = self.serializer.serialize(&value)?;
        self.store.set(&full_key, bytes, &options).await?;
        self.known_keys.insert(full_key.clone(), ());
        tracing::debug!(key = %full_key, ?expiration, "entry populated");

        Ok(value)
    }

    /// Non-populating lookup
    ///
    /// Returns `None` on a miss; never invokes a factory.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.validated_key(key)?;
        self.lookup(&full_key).await
    }

    /// Cancel a dependency trigger and evict every attached entry
    ///
    /// Returns the number of entries evicted. An unknown name is a no-op,
    /// not an error: the dependency may never have been referenced.
    pub async fn invalidate_dependency(&self, name: &str) -> Result<u64> {
        if name.trim().is_empty() {
            return Err(CacheError::InvalidKey(
                "dependency name must not be empty".to_string(),
            ));
        }

        let cancelled = self.registry.invalidate(name).await?;
        let evicted = self.store.evict_dependents(name).await?;
        tracing::debug!(dependency = name, cancelled, evicted, "dependency invalidated");
        Ok(evicted)
    }

    /// Remove every key this manager instance has stored
    ///
    /// Scoped to the known-key list; unrelated entries other users of the
    /// same backend wrote are left alone.
    pub async fn clear(&self) -> Result<()> {
        let keys: Vec<String> = self
            .known_keys
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for key in &keys {
            self.store.remove(key).await?;
        }
        self.known_keys.clear();
        Ok(())
    }

    /// Get store statistics
    pub async fn stats(&self) -> Result<StoreStats> {
        self.store.stats().await
    }

    /// Get the number of entries in the underlying store
    pub async fn len(&self) -> Result<usize> {
        self.store.len().await
    }

    /// Check if the underlying store is empty
    pub async fn is_empty(&self) -> Result<bool> {
        self.store.is_empty().await
    }

    /// Read an entry and deserialize it, repairing dead state on the way
    ///
    /// Two degradations happen here, both reported as a plain miss:
    /// - a recorded dependency whose registered trigger is gone, cancelled,
    ///   or carries a different id means the name was invalidated after the
    ///   entry was stored (a byte store has no live eviction wiring, so
    ///   this is where the Redis flavor learns about invalidations from
    ///   other processes);
    /// - a payload that no longer deserializes.
    async fn lookup<T: DeserializeOwned>(&self, full_key: &str) -> Result<Option<T>> {
        let Some(entry) = self.store.try_get(full_key).await? else {
            return Ok(None);
        };

        if !self.dependencies_still_live(&entry).await? {
            tracing::debug!(key = %full_key, "evicting entry with dead dependency");
            self.store.remove(full_key).await?;
            return Ok(None);
        }

        match self.serializer.deserialize(&entry.value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(key = %full_key, error = %e, "evicting undecodable entry");
                self.store.remove(full_key).await?;
                Ok(None)
            }
        }
    }

    async fn dependencies_still_live(&self, entry: &StoredEntry) -> Result<bool> {
        for dep in &entry.dependencies {
            let live = match self.registry.current(&dep.name).await? {
                Some(trigger) => dep.matches(&trigger),
                None => false,
            };
            if !live {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<B, S> Clone for DeliveryCache<B, S>
where
    B: CacheStore + DependencyStore,
    S: Serializer,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            serializer: self.serializer.clone(),
            config: self.config.clone(),
            key_locks: self.key_locks.clone(),
            registry: self.registry.clone(),
            known_keys: self.known_keys.clone(),
        }
    }
}
