//! Error types for cache operations

use std::sync::Arc;
use thiserror::Error;

/// Main error type for all cache operations
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// A null/empty key was passed to a public operation
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// The value factory failed; carried verbatim, nothing is cached
    #[error(transparent)]
    Factory(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Backend connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Wrap a factory failure so it can travel through the cache unchanged.
    pub fn factory(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CacheError::Factory(Arc::new(err))
    }

    /// Wrap a plain message as a factory failure.
    pub fn factory_msg(msg: impl Into<String>) -> Self {
        #[derive(Debug, Error)]
        #[error("{0}")]
        struct Message(String);

        CacheError::Factory(Arc::new(Message(msg.into())))
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::InvalidKey("cache key must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "invalid cache key: cache key must not be empty"
        );

        let err = CacheError::Serialization("failed".to_string());
        assert_eq!(err.to_string(), "serialization error: failed");
    }

    #[test]
    fn test_factory_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out");
        let err = CacheError::factory(io);
        assert_eq!(err.to_string(), "connect timed out");
    }

    #[test]
    fn test_error_clone() {
        let err = CacheError::factory_msg("upstream returned 503");
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
