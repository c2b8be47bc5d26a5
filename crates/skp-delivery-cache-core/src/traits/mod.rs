//! Core traits for cache operations

mod freshness;
mod serializer;
mod store;

pub use freshness::Freshness;
pub use serializer::{JsonSerializer, Serializer};
pub use store::{CacheStore, DependencyStore};

#[cfg(feature = "msgpack")]
pub use serializer::MsgPackSerializer;
