//! Core types for cache operations

mod entry;
mod options;
mod stats;
mod trigger;

pub use entry::StoredEntry;
pub use options::{EntryOptions, EntryOpts, EntryPriority, Expiration};
pub use stats::StoreStats;
pub use trigger::{DependencyRef, DependencyTrigger};
