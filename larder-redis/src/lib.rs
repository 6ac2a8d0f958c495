//! # Larder Redis
//!
//! Connection bootstrap for the Larder cache layer.
//!
//! This crate turns a [`RedisConfig`] into a ping-verified
//! [`redis::aio::ConnectionManager`]. Everything above the connection
//! (policies, serialization, bulk operations) lives in `larder-cache`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use larder_redis::{RedisConfig, connect};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::builder()
//!         .url("redis://localhost:6379")
//!         .database(1)
//!         .build();
//!
//!     let mut conn = connect(&config).await?;
//!
//!     redis::cmd("SET")
//!         .arg("key")
//!         .arg("value")
//!         .exec_async(&mut conn)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;

pub use config::{RedisConfig, RedisConfigBuilder};
pub use connection::{connect, ping};
pub use error::{RedisError, Result};

// Re-export redis crate for convenience
pub use redis;
pub use redis::aio::ConnectionManager;

/// Prelude for common imports.
///
/// ```
/// use larder_redis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RedisConfig, RedisConfigBuilder};
    pub use crate::connection::connect;
    pub use crate::error::{RedisError, Result};
    pub use redis::aio::ConnectionManager;
}
