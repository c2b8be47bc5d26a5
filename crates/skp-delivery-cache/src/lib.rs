//! skp-delivery-cache: Dependency-tracked response cache with single-flight coalescing
//!
//! # Features
//!
//! - **Single-flight population**: one factory call per key, no matter how
//!   many callers race on a miss
//! - **Fresh vs. stale expiration**: values reporting stale content get a
//!   short absolute TTL, fresh values a sliding one
//! - **Dependency triggers**: one invalidation signal evicts every entry
//!   registered against a name, without knowing their keys
//! - **Two storage flavors** (in-process memory, Redis)
//! - **Pluggable serialization** (JSON, MessagePack)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use skp_delivery_cache::prelude::*;
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct Article {
//!     id: u64,
//!     body: String,
//! }
//!
//! impl Freshness for Article {}
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new(MemoryConfig::default());
//!     let cache = DeliveryCache::new(store);
//!
//!     let article = cache
//!         .get_or_add("article:1", || async {
//!             // expensive remote fetch goes here
//!             Ok(Article { id: 1, body: "hello".into() })
//!         })
//!         .await?;
//!
//!     println!("{}", article.body);
//!     Ok(())
//! }
//! ```

mod manager;

// Re-export core
pub use skp_delivery_cache_core::*;

// Re-export storage
#[cfg(feature = "memory")]
pub use skp_delivery_cache_storage::{MemoryConfig, MemoryStore};

#[cfg(feature = "redis")]
pub use skp_delivery_cache_storage::{RedisConfig, RedisStore};

// Export manager
pub use manager::{DeliveryCache, DeliveryCacheConfig, DependencyRegistry};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CacheError, DeliveryCache, DeliveryCacheConfig, Freshness, JsonSerializer, Result,
        Serializer,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryConfig, MemoryStore};

    #[cfg(feature = "redis")]
    pub use crate::{RedisConfig, RedisStore};

    #[cfg(feature = "msgpack")]
    pub use crate::MsgPackSerializer;
}
