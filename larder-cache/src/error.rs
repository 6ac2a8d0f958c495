//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis-specific error, passed through unchanged.
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Connection bootstrap error.
    #[cfg(feature = "redis")]
    #[error(transparent)]
    Connection(#[from] larder_redis::RedisError),

    /// A command rejected by a non-Redis store (for example a type mismatch).
    #[error("Store error: {0}")]
    Store(String),

    /// A value could not be encoded by the selected serialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes are malformed or do not match the requested shape.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// A stored scalar is not of the requested kind.
    #[error("Cannot parse value at '{key}': {reason}")]
    Parse { key: String, reason: String },

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A collection key has no members.
    #[error("Collection has no members: {0}")]
    EmptyCollection(String),

    /// Malformed policy or configuration value.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Operation timeout
    #[error("Operation timeout")]
    Timeout,
}

impl CacheError {
    /// Whether the error reports an absent key or member.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the error originated in the store or the transport beneath it.
    pub fn is_transport(&self) -> bool {
        match self {
            #[cfg(feature = "redis")]
            Self::Redis(_) | Self::Connection(_) => true,
            Self::Store(_) | Self::Timeout => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::Parse {
            key: "hits".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot parse value at 'hits': invalid digit found in string"
        );
        assert_eq!(
            CacheError::EmptyCollection("team:7".into()).to_string(),
            "Collection has no members: team:7"
        );
    }

    #[test]
    fn test_classification() {
        assert!(CacheError::NotFound("k".into()).is_not_found());
        assert!(!CacheError::Timeout.is_not_found());
        assert!(CacheError::Timeout.is_transport());
        assert!(CacheError::Store("WRONGTYPE".into()).is_transport());
        assert!(!CacheError::Deserialization("eof".into()).is_transport());
    }
}
