//! Stored cache entry type

use crate::{DependencyRef, EntryOptions, EntryPriority, Expiration};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A stored entry with its expiration metadata
///
/// Entries are immutable once stored: a re-population replaces the entry
/// rather than editing it. The only mutation is the `last_accessed` touch
/// that keeps a sliding window alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The serialized value
    pub value: Vec<u8>,
    /// When the entry was created
    pub created_at: SystemTime,
    /// When the entry was last read (drives sliding expiration)
    pub last_accessed: SystemTime,
    /// Expiration policy, decided once at population time
    pub expiration: Expiration,
    /// Eviction priority
    pub priority: EntryPriority,
    /// Dependency triggers this entry was attached to when stored
    pub dependencies: Vec<DependencyRef>,
    /// Payload size in bytes
    pub size: usize,
}

impl StoredEntry {
    /// Create an entry from a payload and its options
    pub fn new(value: Vec<u8>, options: &EntryOptions) -> Self {
        let now = SystemTime::now();
        let size = value.len();
        Self {
            value,
            created_at: now,
            last_accessed: now,
            expiration: options.expiration,
            priority: options.priority,
            dependencies: options.dependencies.clone(),
            size,
        }
    }

    /// Check if the entry has expired under its own policy
    pub fn is_expired(&self) -> bool {
        let (anchor, window) = match self.expiration {
            Expiration::Sliding(d) => (self.last_accessed, d),
            Expiration::Absolute(d) => (self.created_at, d),
            Expiration::Never => return false,
        };
        match anchor.elapsed() {
            Ok(elapsed) => elapsed > window,
            // Clock went backwards; treat as live rather than evicting.
            Err(_) => false,
        }
    }

    /// Restart the sliding window after a read
    pub fn touch(&mut self) {
        if matches!(self.expiration, Expiration::Sliding(_)) {
            self.last_accessed = SystemTime::now();
        }
    }

    /// Whether the capacity guard may evict this entry
    pub fn is_evictable(&self) -> bool {
        self.priority == EntryPriority::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_entry() {
        let entry = StoredEntry::new(b"payload".to_vec(), &EntryOptions::default());
        assert_eq!(entry.size, 7);
        assert!(!entry.is_expired());
        assert!(entry.is_evictable());
    }

    #[test]
    fn test_never_expires() {
        let mut entry = StoredEntry::new(Vec::new(), &EntryOptions::pinned());
        entry.created_at = SystemTime::now() - Duration::from_secs(86_400);
        assert!(!entry.is_expired());
        assert!(!entry.is_evictable());
    }

    #[test]
    fn test_absolute_expiration() {
        let options = EntryOptions {
            expiration: Expiration::Absolute(Duration::from_secs(10)),
            ..Default::default()
        };
        let mut entry = StoredEntry::new(Vec::new(), &options);
        assert!(!entry.is_expired());

        entry.created_at = SystemTime::now() - Duration::from_secs(11);
        assert!(entry.is_expired());

        // Absolute windows do not restart on reads.
        entry.touch();
        assert!(entry.is_expired());
    }

    #[test]
    fn test_sliding_expiration_restarts_on_touch() {
        let options = EntryOptions {
            expiration: Expiration::Sliding(Duration::from_secs(10)),
            ..Default::default()
        };
        let mut entry = StoredEntry::new(Vec::new(), &options);
        entry.last_accessed = SystemTime::now() - Duration::from_secs(11);
        assert!(entry.is_expired());

        entry.touch();
        assert!(!entry.is_expired());
    }
}
