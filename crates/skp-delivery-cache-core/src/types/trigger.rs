//! Dependency trigger types

use serde::{Deserialize, Serialize};

/// A named, cancellable invalidation trigger
///
/// At most one live (non-cancelled) trigger exists per name at any time;
/// the registry owns trigger lifetimes. A cancelled trigger is never
/// reused: the next entry depending on that name causes a fresh trigger
/// with a new id to be minted.
///
/// The id is the serializable stand-in for a live cancellation handle, so
/// the Redis store can express "was this name invalidated since the entry
/// was stored?" as a plain id comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTrigger {
    /// The logical invalidation group, e.g. `"content-item:123"`
    pub name: String,
    /// Random generation id, unique per live trigger
    pub id: u64,
    /// Whether the trigger has been cancelled
    pub cancelled: bool,
}

impl DependencyTrigger {
    /// Create a fresh, live trigger
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id,
            cancelled: false,
        }
    }

    /// Whether entries may still be attached to this trigger
    pub fn is_live(&self) -> bool {
        !self.cancelled
    }

    /// The reference an attached entry records
    pub fn entry_ref(&self) -> DependencyRef {
        DependencyRef {
            name: self.name.clone(),
            trigger_id: self.id,
        }
    }
}

/// An entry's record of the trigger it was attached to at store time
///
/// Read-repair compares this against the currently registered trigger: a
/// different id (or no live trigger at all) means the name was invalidated
/// after the entry was stored, so the entry is dead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    /// Dependency name
    pub name: String,
    /// Id of the trigger that was live when the entry was stored
    pub trigger_id: u64,
}

impl DependencyRef {
    /// Whether this reference still points at the given trigger
    pub fn matches(&self, trigger: &DependencyTrigger) -> bool {
        trigger.is_live() && trigger.name == self.name && trigger.id == self.trigger_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_ref_matches_live_trigger() {
        let trigger = DependencyTrigger::new("content-item:1", 42);
        let entry_ref = trigger.entry_ref();
        assert!(entry_ref.matches(&trigger));
    }

    #[test]
    fn test_cancelled_trigger_never_matches() {
        let mut trigger = DependencyTrigger::new("content-item:1", 42);
        let entry_ref = trigger.entry_ref();

        trigger.cancelled = true;
        assert!(!trigger.is_live());
        assert!(!entry_ref.matches(&trigger));
    }

    #[test]
    fn test_reminted_trigger_does_not_match_old_ref() {
        let old = DependencyTrigger::new("content-item:1", 42);
        let entry_ref = old.entry_ref();

        let reminted = DependencyTrigger::new("content-item:1", 43);
        assert!(!entry_ref.matches(&reminted));
    }
}
