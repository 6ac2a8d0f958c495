//! Cache configuration types.

use crate::error::{CacheError, CacheResult};
use crate::policy::CachePolicy;
use crate::serialize::Serialization;
use larder_redis::RedisConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Connection settings for the Redis store.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Expiration applied when no override sets one. `None` keeps entries forever.
    #[serde(with = "optional_seconds", default)]
    pub default_expiration: Option<Duration>,

    /// Serialization applied when no override sets one.
    #[serde(default)]
    pub serialization: Serialization,

    /// Key prefix for all cache keys
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Upper bound for any single client operation.
    #[serde(with = "optional_seconds", default)]
    pub operation_timeout: Option<Duration>,

    /// Work hint passed to each `SCAN` page during pattern deletes.
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
}

fn default_scan_count() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            default_expiration: None,
            serialization: Serialization::Json,
            key_prefix: None,
            operation_timeout: None,
            scan_count: default_scan_count(),
        }
    }
}

impl CacheConfig {
    /// Create a new Redis cache configuration.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Examples
    ///
    /// ```
    /// use larder_cache::CacheConfig;
    ///
    /// let config = CacheConfig::redis("redis://localhost:6379");
    /// assert_eq!(config.redis.url, "redis://localhost:6379");
    /// ```
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            redis: RedisConfig::new(url),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Connection settings come from [`RedisConfig::from_env`]. Cache settings
    /// are read from `CACHE_DEFAULT_TTL` (seconds), `CACHE_SERIALIZATION`
    /// (`json` or `msgpack`), `CACHE_KEY_PREFIX`, `CACHE_OPERATION_TIMEOUT`
    /// (seconds) and `CACHE_SCAN_COUNT`. A set but malformed value is an
    /// [`CacheError::InvalidOptions`].
    pub fn from_env() -> CacheResult<Self> {
        let mut config = Self {
            redis: RedisConfig::from_env().build(),
            ..Default::default()
        };

        if let Some(secs) = env_parse::<u64>("CACHE_DEFAULT_TTL")? {
            config = config.with_default_expiration(Duration::from_secs(secs));
        }

        if let Ok(name) = std::env::var("CACHE_SERIALIZATION") {
            config.serialization = name.parse()?;
        }

        if let Ok(prefix) = std::env::var("CACHE_KEY_PREFIX") {
            config = config.with_key_prefix(prefix);
        }

        if let Some(secs) = env_parse::<u64>("CACHE_OPERATION_TIMEOUT")? {
            config = config.with_operation_timeout(Duration::from_secs(secs));
        }

        if let Some(count) = env_parse::<usize>("CACHE_SCAN_COUNT")? {
            config = config.with_scan_count(count);
        }

        Ok(config)
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.key_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Set the default expiration. Zero means entries never expire.
    pub fn with_default_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = (!expiration.is_zero()).then_some(expiration);
        self
    }

    /// Set the default serialization.
    pub fn with_serialization(mut self, serialization: Serialization) -> Self {
        self.serialization = serialization;
        self
    }

    /// Set the operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Set the scan page hint.
    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }

    /// The client-wide policy every call's overrides are merged over.
    pub fn default_policy(&self) -> CachePolicy {
        let policy = CachePolicy::new().with_strategy(self.serialization);
        match self.default_expiration {
            Some(expiration) => policy.with_expiration(expiration),
            None => policy,
        }
    }

    /// Build the final key with prefix if configured.
    pub fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> CacheResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CacheError::InvalidOptions(format!("{}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

mod optional_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.filter(|s| *s > 0).map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config() {
        let config = CacheConfig::redis("redis://localhost:6379");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.serialization, Serialization::Json);
        assert_eq!(config.scan_count, 100);
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::redis("redis://localhost:6379")
            .with_key_prefix("app")
            .with_default_expiration(Duration::from_secs(300))
            .with_serialization(Serialization::MessagePack)
            .with_scan_count(0);

        assert_eq!(config.key_prefix, Some("app".to_string()));
        assert_eq!(config.default_expiration, Some(Duration::from_secs(300)));
        assert_eq!(config.scan_count, 1);
    }

    #[test]
    fn test_default_policy() {
        let policy = CacheConfig::default()
            .with_default_expiration(Duration::from_secs(60))
            .default_policy();

        assert_eq!(policy.expiration(), Some(Duration::from_secs(60)));
        assert_eq!(policy.strategy(), Serialization::Json);
        assert!(policy.has_strategy());

        let forever = CacheConfig::default()
            .with_default_expiration(Duration::ZERO)
            .default_policy();
        assert_eq!(forever.expiration(), None);
    }

    #[test]
    fn test_build_key_with_prefix() {
        let config = CacheConfig::redis("redis://localhost:6379").with_key_prefix("myapp");
        assert_eq!(config.build_key("user:123"), "myapp:user:123");
    }

    #[test]
    fn test_build_key_without_prefix() {
        let config = CacheConfig::redis("redis://localhost:6379").with_key_prefix("");
        assert_eq!(config.build_key("user:123"), "user:123");
    }

    #[test]
    fn test_deserialize() {
        let config: CacheConfig = serde_json::from_str(
            r#"{
                "redis": {"url": "redis://cache:6379"},
                "default_expiration": 120,
                "serialization": "msgpack",
                "key_prefix": "svc"
            }"#,
        )
        .unwrap();

        assert_eq!(config.redis.url, "redis://cache:6379");
        assert_eq!(config.default_expiration, Some(Duration::from_secs(120)));
        assert_eq!(config.serialization, Serialization::MessagePack);
        assert_eq!(config.operation_timeout, None);
        assert_eq!(config.scan_count, 100);
    }

    #[test]
    fn test_deserialize_rejects_unknown_serialization() {
        let result = serde_json::from_str::<CacheConfig>(r#"{"serialization": "protobuf"}"#);
        assert!(result.is_err());
    }
}
