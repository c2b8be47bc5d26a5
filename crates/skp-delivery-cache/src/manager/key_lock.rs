//! Per-key mutual exclusion for cache population

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-key lock map guaranteeing at most one in-flight producer per key
///
/// A mutex is created lazily on the first miss for a key and retained for
/// the lifetime of the map. Locks are intentionally never removed: growth
/// is bounded by the cardinality of distinct keys requested over the
/// process lifetime, and an idle mutex is a few dozen bytes.
///
/// Callers hold the returned `Arc` and await `lock()` on it; the guard
/// releases on every exit path, including a factory error or a cancelled
/// caller, so a failed population never blocks a retry.
#[derive(Clone, Default)]
pub(crate) struct KeyLockMap {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLockMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Get (or lazily create) the mutex for a key
    pub(crate) fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks.entry(key.to_string()).or_default().clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_critical_sections_never_overlap() {
        let locks = KeyLockMap::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let inside = inside.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let lock = locks.lock_for("shared");
                let _guard = lock.lock().await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let locks = KeyLockMap::new();

        let a = locks.lock_for("a");
        let _guard_a = a.lock().await;

        // Holding "a" must not block "b".
        let b = locks.lock_for("b");
        let guard_b = tokio::time::timeout(Duration::from_millis(50), b.lock()).await;
        assert!(guard_b.is_ok());
    }

    #[tokio::test]
    async fn test_locks_are_retained() {
        let locks = KeyLockMap::new();
        drop(locks.lock_for("x"));
        drop(locks.lock_for("x"));
        drop(locks.lock_for("y"));
        assert_eq!(locks.len(), 2);
    }
}
