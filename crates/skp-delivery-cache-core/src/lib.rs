//! skp-delivery-cache-core: Core traits and types for the skp-delivery-cache library
//!
//! This crate provides the foundational types and traits used throughout
//! the skp-delivery-cache ecosystem: the storage contract, the pluggable
//! serializer, the freshness capability, and the dependency-trigger types
//! that drive group invalidation.

mod error;
mod traits;
mod types;

pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;
