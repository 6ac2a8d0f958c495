// Larder - typed cache access over Redis
//
// This library re-exports the cache client and its Redis connection layer
// behind cargo features.

// Re-export optional crates
#[cfg(feature = "cache")]
pub use larder_cache;

#[cfg(feature = "redis")]
pub use larder_redis;

#[cfg(feature = "cache")]
pub use larder_cache::{
    CacheClient, CacheConfig, CacheError, CachePolicy, CacheResult, CacheStore, DataSet,
    InMemoryStore, Serialization,
};

#[cfg(all(feature = "cache", feature = "redis"))]
pub use larder_cache::RedisStore;

#[cfg(feature = "redis")]
pub use larder_redis::{RedisConfig, RedisError};

/// Prelude for common imports.
///
/// ```
/// use larder::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "cache")]
    pub use larder_cache::prelude::*;

    #[cfg(feature = "redis")]
    pub use larder_redis::RedisConfig;
}
