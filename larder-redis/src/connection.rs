//! Connection bootstrap.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::{RedisConfig, RedisError, Result};

/// Open a Redis connection manager and verify it with `PING`.
///
/// The returned manager multiplexes commands over one connection and
/// reconnects on its own; cloning it is cheap and every clone shares the
/// same underlying connection.
pub async fn connect(config: &RedisConfig) -> Result<ConnectionManager> {
    let url = config.connection_url()?;
    let client = Client::open(url.as_str()).map_err(|e| RedisError::Connection(e.to_string()))?;

    let mut manager = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| RedisError::Timeout)?
        .map_err(|e| RedisError::Connection(e.to_string()))?;

    ping(&mut manager, config).await?;

    info!(
        url = %config.redacted_url(),
        database = ?config.database,
        "Redis connection established"
    );

    Ok(manager)
}

/// Check that the server answers `PING` within the connection timeout.
pub async fn ping(manager: &mut ConnectionManager, config: &RedisConfig) -> Result<()> {
    let reply: String = tokio::time::timeout(
        config.connection_timeout,
        redis::cmd("PING").query_async(manager),
    )
    .await
    .map_err(|_| RedisError::Timeout)?
    .map_err(|e| RedisError::Connection(e.to_string()))?;

    debug!(reply = %reply, "Redis ping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let config = RedisConfig::new("ftp://localhost:6379");
        let err = connect(&config).await.unwrap_err();
        assert!(matches!(err, RedisError::InvalidUrl(_)));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_connect_and_ping() {
        let config = RedisConfig::from_env().build();
        let mut manager = connect(&config).await.unwrap();
        ping(&mut manager, &config).await.unwrap();
    }
}
