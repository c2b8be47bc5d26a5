//! Entry options and builder

use crate::DependencyRef;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Expiration policy for a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiration {
    /// Expires when the entry has not been read for the given duration
    Sliding(Duration),
    /// Expires a fixed duration after creation, regardless of reads
    Absolute(Duration),
    /// Never expires on its own; only explicit removal evicts it
    Never,
}

impl Expiration {
    /// The time-to-live a TTL-native store should apply right now
    ///
    /// For sliding entries this is the window to re-arm on every read.
    pub fn ttl_hint(&self) -> Option<Duration> {
        match self {
            Expiration::Sliding(d) | Expiration::Absolute(d) => Some(*d),
            Expiration::Never => None,
        }
    }
}

/// Eviction priority for a cache entry
///
/// `NeverEvict` is reserved for registry bookkeeping (dependency triggers):
/// the memory store's capacity guard skips such entries and the Redis store
/// applies no TTL to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryPriority {
    /// Ordinary data entry, subject to expiration and capacity eviction
    #[default]
    Normal,
    /// Pinned entry that only explicit removal can take out
    NeverEvict,
}

/// Configuration options for a cache entry
#[derive(Debug, Clone)]
pub struct EntryOptions {
    /// Expiration policy
    pub expiration: Expiration,
    /// Eviction priority
    pub priority: EntryPriority,
    /// Dependency triggers this entry is attached to
    pub dependencies: Vec<DependencyRef>,
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self {
            expiration: Expiration::Never,
            priority: EntryPriority::Normal,
            dependencies: Vec::new(),
        }
    }
}

impl EntryOptions {
    /// Options for a registry-owned trigger entry: pinned, never expiring.
    pub fn pinned() -> Self {
        Self {
            expiration: Expiration::Never,
            priority: EntryPriority::NeverEvict,
            dependencies: Vec::new(),
        }
    }
}

/// Builder for [`EntryOptions`] with fluent API
#[derive(Debug, Clone, Default)]
pub struct EntryOpts(EntryOptions);

impl EntryOpts {
    /// Create new options builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a sliding expiration window
    pub fn sliding(mut self, duration: Duration) -> Self {
        self.0.expiration = Expiration::Sliding(duration);
        self
    }

    /// Use an absolute expiration
    pub fn absolute(mut self, duration: Duration) -> Self {
        self.0.expiration = Expiration::Absolute(duration);
        self
    }

    /// Pin the entry against capacity eviction
    pub fn never_evict(mut self) -> Self {
        self.0.priority = EntryPriority::NeverEvict;
        self
    }

    /// Attach a dependency trigger reference
    pub fn depends_on(mut self, dep: DependencyRef) -> Self {
        self.0.dependencies.push(dep);
        self
    }

    /// Build the options
    pub fn build(self) -> EntryOptions {
        self.0
    }
}

impl From<EntryOpts> for EntryOptions {
    fn from(opts: EntryOpts) -> Self {
        opts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let opts = EntryOpts::new().build();
        assert_eq!(opts.expiration, Expiration::Never);
        assert_eq!(opts.priority, EntryPriority::Normal);
        assert!(opts.dependencies.is_empty());
    }

    #[test]
    fn test_builder_fluent() {
        let opts = EntryOpts::new()
            .sliding(Duration::from_secs(60))
            .depends_on(DependencyRef {
                name: "content-item:1".into(),
                trigger_id: 7,
            })
            .build();

        assert_eq!(opts.expiration, Expiration::Sliding(Duration::from_secs(60)));
        assert_eq!(opts.dependencies.len(), 1);
    }

    #[test]
    fn test_pinned_options() {
        let opts = EntryOptions::pinned();
        assert_eq!(opts.expiration, Expiration::Never);
        assert_eq!(opts.priority, EntryPriority::NeverEvict);
    }

    #[test]
    fn test_ttl_hint() {
        assert_eq!(
            Expiration::Absolute(Duration::from_secs(10)).ttl_hint(),
            Some(Duration::from_secs(10))
        );
        assert_eq!(Expiration::Never.ttl_hint(), None);
    }
}
