//! Dependency trigger registry

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use skp_delivery_cache_core::{
    CacheError, CacheStore, DependencyTrigger, EntryOptions, Result,
};

/// Reserved key prefix for trigger records in the backing store
pub(crate) const TRIGGER_PREFIX: &str = "__trigger__:";

/// Registry mapping dependency names to their canonical live trigger
///
/// Trigger state lives in the same store as the data entries, pinned
/// (`Expiration::Never` + `NeverEvict`) so it can only leave the store by
/// explicit cancellation. For a given name at most one live trigger exists
/// at any time; a name-scoped lock makes minting race-free, and a caller
/// that loses the race adopts the winner's trigger.
pub struct DependencyRegistry<B> {
    store: Arc<B>,
    name_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl<B> Clone for DependencyRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name_locks: self.name_locks.clone(),
        }
    }
}

impl<B: CacheStore> DependencyRegistry<B> {
    /// Create a registry over a (shared) backing store
    pub fn new(store: Arc<B>) -> Self {
        Self {
            store,
            name_locks: Arc::new(DashMap::new()),
        }
    }

    fn trigger_key(name: &str) -> String {
        format!("{TRIGGER_PREFIX}{name}")
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.name_locks.entry(name.to_string()).or_default().clone()
    }

    /// Load the stored trigger record for a name
    ///
    /// A record that fails to decode is dropped and treated as absent.
    async fn load(&self, name: &str) -> Result<Option<DependencyTrigger>> {
        let key = Self::trigger_key(name);
        let Some(entry) = self.store.try_get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_slice(&entry.value) {
            Ok(trigger) => Ok(Some(trigger)),
            Err(e) => {
                tracing::debug!(dependency = name, error = %e, "dropping undecodable trigger record");
                self.store.remove(&key).await?;
                Ok(None)
            }
        }
    }

    async fn persist(&self, trigger: &DependencyTrigger) -> Result<()> {
        let bytes = serde_json::to_vec(trigger)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store
            .set(&Self::trigger_key(&trigger.name), bytes, &EntryOptions::pinned())
            .await?;
        Ok(())
    }

    /// The currently registered trigger for a name, if any
    ///
    /// Used by read-repair; does not mint.
    pub async fn current(&self, name: &str) -> Result<Option<DependencyTrigger>> {
        self.load(name).await
    }

    /// Resolve the canonical live trigger for a name, minting if needed
    ///
    /// Double-checked: the lock-free load covers the common case of an
    /// existing live trigger; the name lock plus re-load makes sure two
    /// concurrent callers on a new name agree on one winner.
    pub async fn resolve(&self, name: &str) -> Result<DependencyTrigger> {
        if let Some(trigger) = self.load(name).await? {
            if trigger.is_live() {
                return Ok(trigger);
            }
        }

        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        // Adopt the winner if a concurrent caller minted first.
        if let Some(trigger) = self.load(name).await? {
            if trigger.is_live() {
                return Ok(trigger);
            }
        }

        let trigger = DependencyTrigger::new(name, rand::random::<u64>());
        self.persist(&trigger).await?;
        tracing::debug!(dependency = name, id = trigger.id, "minted dependency trigger");
        Ok(trigger)
    }

    /// Cancel the live trigger for a name
    ///
    /// Returns `true` if a live trigger was cancelled. An unknown or
    /// already cancelled name is a no-op: the dependency may simply never
    /// have been referenced.
    pub async fn invalidate(&self, name: &str) -> Result<bool> {
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        match self.load(name).await? {
            Some(mut trigger) if trigger.is_live() => {
                trigger.cancelled = true;
                self.persist(&trigger).await?;
                tracing::debug!(dependency = name, id = trigger.id, "trigger cancelled");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skp_delivery_cache_storage::MemoryStore;

    fn registry() -> DependencyRegistry<MemoryStore> {
        DependencyRegistry::new(Arc::new(MemoryStore::with_defaults()))
    }

    #[tokio::test]
    async fn test_resolve_is_stable() {
        let registry = registry();

        let first = registry.resolve("content-item:1").await.unwrap();
        let second = registry.resolve("content-item:1").await.unwrap();

        assert_eq!(first, second);
        assert!(first.is_live());
    }

    #[tokio::test]
    async fn test_invalidate_mints_a_fresh_trigger_on_next_resolve() {
        let registry = registry();

        let before = registry.resolve("content-item:1").await.unwrap();
        assert!(registry.invalidate("content-item:1").await.unwrap());

        let current = registry.current("content-item:1").await.unwrap().unwrap();
        assert!(!current.is_live());

        let after = registry.resolve("content-item:1").await.unwrap();
        assert!(after.is_live());
        assert_ne!(before.id, after.id);
    }

    #[tokio::test]
    async fn test_invalidate_unknown_name_is_noop() {
        let registry = registry();
        assert!(!registry.invalidate("never-referenced").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_twice_cancels_once() {
        let registry = registry();
        registry.resolve("d").await.unwrap();

        assert!(registry.invalidate("d").await.unwrap());
        assert!(!registry.invalidate("d").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolve_agrees_on_one_trigger() {
        let registry = registry();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(
                async move { registry.resolve("raced").await.unwrap() },
            ));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "every caller must adopt the same trigger");
    }
}
