//! Cache store traits

use crate::{CacheError, EntryOptions, StoreStats, StoredEntry};
use async_trait::async_trait;

/// Core trait for all cache storage backends
///
/// This trait defines the operations any storage flavor must support.
/// Implementations include the in-process memory store and the Redis store.
///
/// Stores hold serialized bytes wrapped in a [`StoredEntry`]; value
/// (de)serialization is the manager's concern, not the store's.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Look up an entry by key
    ///
    /// Returns `None` if the key doesn't exist or has expired. A missing
    /// key is never an error. Sliding entries are touched on a hit so the
    /// expiration window restarts.
    async fn try_get(&self, key: &str) -> Result<Option<StoredEntry>, CacheError>;

    /// Store an entry
    ///
    /// Returns the canonical stored entry, so copy-on-write stores can hand
    /// back the instance they actually retained.
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        options: &EntryOptions,
    ) -> Result<StoredEntry, CacheError>;

    /// Remove a key
    ///
    /// Idempotent; removing an absent key is not an error. Returns `true`
    /// if the key existed and was removed.
    async fn remove(&self, key: &str) -> Result<bool, CacheError>;

    /// Clear all entries from the store
    async fn clear(&self) -> Result<(), CacheError>;

    /// Get store statistics
    async fn stats(&self) -> Result<StoreStats, CacheError>;

    /// Get the number of entries in the store
    async fn len(&self) -> Result<usize, CacheError>;

    /// Check if the store is empty
    async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }
}

/// Extended trait for stores that index entries by dependency name
///
/// The index is maintained at `set` time from the entry's attached
/// [`DependencyRef`](crate::DependencyRef) list and consumed when a
/// dependency is invalidated.
#[async_trait]
pub trait DependencyStore: CacheStore {
    /// Evict every entry attached to the named dependency
    ///
    /// Returns the number of entries that were evicted.
    async fn evict_dependents(&self, name: &str) -> Result<u64, CacheError>;
}
