//! In-memory cache store using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

use skp_delivery_cache_core::{
    CacheStore, DependencyStore, EntryOptions, Result, StoreStats, StoredEntry,
};

/// Configuration for the memory store
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum number of entries (0 = unlimited)
    pub max_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl MemoryConfig {
    /// Create config with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            max_capacity: capacity,
        }
    }

    /// Create config with unlimited capacity
    pub fn unlimited() -> Self {
        Self { max_capacity: 0 }
    }
}

/// Internal statistics tracking
#[derive(Debug, Default)]
struct MemoryStats {
    hits: u64,
    misses: u64,
    writes: u64,
    removals: u64,
    evictions: u64,
}

/// Dependency name -> keys index
type DependencyIndex = DashMap<String, HashSet<String>>;

/// In-process cache store
///
/// Uses `DashMap` for concurrent access. Expired entries are removed
/// lazily at read time; dependency eviction goes through an index
/// maintained on every write, so cancelling a trigger evicts its
/// dependents immediately without scanning the whole store.
///
/// Cloning creates a new handle to the SAME underlying store.
#[derive(Clone)]
pub struct MemoryStore {
    /// Main data store
    data: Arc<DashMap<String, StoredEntry>>,
    /// Dependency name -> keys index
    dep_index: Arc<DependencyIndex>,
    /// Statistics
    stats: Arc<RwLock<MemoryStats>>,
    /// Configuration
    config: MemoryConfig,
}

impl MemoryStore {
    /// Create a new memory store
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            data: Arc::new(DashMap::with_capacity(config.max_capacity.min(10_000))),
            dep_index: Arc::new(DashMap::new()),
            stats: Arc::new(RwLock::new(MemoryStats::default())),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Evict ordinary entries if at capacity
    ///
    /// Pinned (`NeverEvict`) entries are skipped; they are registry
    /// bookkeeping and only explicit removal takes them out.
    fn maybe_evict(&self) {
        if self.config.max_capacity == 0 {
            return; // Unlimited
        }

        if self.data.len() < self.config.max_capacity {
            return;
        }

        let overshoot = self
            .data
            .len()
            .saturating_sub(self.config.max_capacity - 1);

        let keys_to_remove: Vec<String> = self
            .data
            .iter()
            .filter(|entry| entry.value().is_evictable())
            .take(overshoot)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys_to_remove {
            if self.remove_entry(&key) {
                self.stats.write().evictions += 1;
            }
        }
    }

    /// Remove an entry and clean up the dependency index
    fn remove_entry(&self, key: &str) -> bool {
        match self.data.remove(key) {
            Some((_, entry)) => {
                for dep in &entry.dependencies {
                    if let Some(mut keys) = self.dep_index.get_mut(&dep.name) {
                        keys.remove(key);
                    }
                }
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn try_get(&self, key: &str) -> Result<Option<StoredEntry>> {
        match self.data.get_mut(key) {
            Some(mut entry) => {
                if entry.is_expired() {
                    drop(entry);
                    self.remove_entry(key);
                    let mut stats = self.stats.write();
                    stats.misses += 1;
                    stats.evictions += 1;
                    return Ok(None);
                }

                entry.touch();
                self.stats.write().hits += 1;
                Ok(Some(entry.clone()))
            }
            None => {
                self.stats.write().misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<StoredEntry> {
        // Detach a replaced entry from the index so its old dependency
        // names stop pointing at this key. Doing this before the capacity
        // check means an overwrite never evicts an unrelated key.
        self.remove_entry(key);
        self.maybe_evict();

        let entry = StoredEntry::new(value, options);

        for dep in &options.dependencies {
            self.dep_index
                .entry(dep.name.clone())
                .or_default()
                .insert(key.to_string());
        }

        self.data.insert(key.to_string(), entry.clone());
        self.stats.write().writes += 1;

        Ok(entry)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        if self.remove_entry(key) {
            self.stats.write().removals += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn clear(&self) -> Result<()> {
        self.data.clear();
        self.dep_index.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let stats = self.stats.read();
        Ok(StoreStats {
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            removals: stats.removals,
            evictions: stats.evictions,
            size: self.data.len(),
        })
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.data.len())
    }
}

#[async_trait]
impl DependencyStore for MemoryStore {
    async fn evict_dependents(&self, name: &str) -> Result<u64> {
        let Some((_, keys)) = self.dep_index.remove(name) else {
            return Ok(0);
        };

        let mut count = 0;
        for key in keys {
            if self.remove_entry(&key) {
                self.stats.write().evictions += 1;
                count += 1;
            }
        }
        tracing::debug!(dependency = name, evicted = count, "dependents evicted");
        Ok(count)
    }
}
