//! Redis connection error types.

use thiserror::Error;

/// Result type for connection bootstrap.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Errors raised while configuring or opening a Redis connection.
#[derive(Debug, Error)]
pub enum RedisError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configured URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout error.
    #[error("Operation timed out")]
    Timeout,

    /// Underlying Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RedisError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::Redis(err) => err.is_timeout() || err.is_connection_dropped(),
            _ => false,
        }
    }

    /// Check if this error indicates connection loss.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(RedisError::Timeout.is_retryable());
        assert!(RedisError::Connection("refused".into()).is_retryable());
        assert!(!RedisError::Config("bad".into()).is_retryable());
        assert!(!RedisError::InvalidUrl("nope".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = RedisError::InvalidUrl("http://x".to_string());
        assert_eq!(err.to_string(), "Invalid URL: http://x");
    }
}
