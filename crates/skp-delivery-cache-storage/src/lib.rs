//! skp-delivery-cache-storage: Storage backends for skp-delivery-cache

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryConfig, MemoryStore};

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use redis::{RedisConfig, RedisStore};
