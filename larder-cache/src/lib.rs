//! Typed cache access over Redis.
//!
//! Stores and reads scalars and structured values with per-call policies
//! (expiration and serialization), and offers bulk reads, pipelined bulk
//! writes, pattern deletes and transactional collections of keys.
//!
//! # Features
//!
//! - `redis` - Enable the Redis store (enabled by default)
//! - **Per-call policies** - Overrides merge left to right over the client default
//! - **JSON and MessagePack** - Chosen per call, decoded with the same choice
//! - **Collections** - Keys registered in a set, written and expired atomically
//!
//! # Examples
//!
//! ## Redis Cache
//!
//! ```no_run
//! use larder_cache::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CacheError> {
//!     let config = CacheConfig::redis("redis://localhost:6379")
//!         .with_default_expiration(Duration::from_secs(300));
//!     let cache = CacheClient::connect(config).await?;
//!
//!     cache.set("counter", &7, &[]).await?;
//!     assert_eq!(cache.get_int("counter").await?, 7);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Collections
//!
//! ```
//! use larder_cache::*;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), CacheError> {
//! let cache = CacheClient::new(InMemoryStore::new(), CacheConfig::default());
//!
//! let users = [
//!     DataSet::new("user:1", serde_json::json!({"name": "Alice"})),
//!     DataSet::new("user:2", serde_json::json!({"name": "Bob"})),
//! ];
//! cache
//!     .set_members("team:red", &users, &[Duration::from_secs(60).into()])
//!     .await?;
//!
//! let (count, members) = cache
//!     .get_members::<serde_json::Value>("team:red", &[])
//!     .await?;
//! assert_eq!(count, 2);
//! assert_eq!(members.len(), 2);
//!
//! cache.invalidate_collection("team:red").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod policy;
pub mod scalar;
pub mod serialize;
pub mod store;

#[cfg(feature = "redis")]
pub mod redis_store;

pub use client::{CacheClient, DataSet};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use larder_redis::RedisConfig;
pub use memory::{InMemoryStore, StoreStats};
pub use policy::CachePolicy;
pub use scalar::Scalar;
pub use serialize::Serialization;
pub use store::{Batch, CacheStore, Command, ScanPage, Ttl};

#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{CacheClient, DataSet};
    pub use crate::config::CacheConfig;
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::memory::InMemoryStore;
    pub use crate::policy::CachePolicy;
    pub use crate::serialize::Serialization;
    pub use crate::store::CacheStore;

    #[cfg(feature = "redis")]
    pub use crate::redis_store::RedisStore;
}
