//! The cache client.

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::policy::CachePolicy;
use crate::scalar::stored_bytes;
use crate::serialize::Serialization;
use crate::store::{Batch, CacheStore, Command};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A key and the value to store under it, as submitted to bulk writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet<T> {
    pub key: String,
    pub value: T,
}

impl<T> DataSet<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl<K: Into<String>, T> From<(K, T)> for DataSet<T> {
    fn from((key, value): (K, T)) -> Self {
        DataSet::new(key, value)
    }
}

/// Typed access to a [`CacheStore`] with per-call policy overrides.
///
/// Every operation that writes or decodes takes `overrides: &[CachePolicy]`.
/// They are merged left to right over the client's default policy (see
/// [`CachePolicy::merge`]) before the operation runs.
///
/// Dropping a returned future cancels the operation. When
/// [`CacheConfig::operation_timeout`] is set, an operation that takes longer
/// fails with [`CacheError::Timeout`].
///
/// # Examples
///
/// ```
/// use larder_cache::*;
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// # #[tokio::main]
/// # async fn main() -> CacheResult<()> {
/// let config = CacheConfig::default().with_default_expiration(Duration::from_secs(60));
/// let cache = CacheClient::new(InMemoryStore::new(), config);
///
/// cache.set("visits", &41, &[]).await?;
/// assert_eq!(cache.get_int("visits").await?, 41);
///
/// let user = User { name: "Alice".into() };
/// cache
///     .set("user:1", &user, &[CachePolicy::from(Serialization::MessagePack)])
///     .await?;
/// let user: User = cache
///     .get_object("user:1", &[CachePolicy::from(Serialization::MessagePack)])
///     .await?;
/// assert_eq!(user.name, "Alice");
/// # Ok(())
/// # }
/// ```
pub struct CacheClient<S: CacheStore> {
    store: Arc<S>,
    config: CacheConfig,
    policy: CachePolicy,
}

impl<S: CacheStore> Clone for CacheClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            policy: self.policy,
        }
    }
}

#[cfg(feature = "redis")]
impl CacheClient<crate::redis_store::RedisStore> {
    /// Connect to the Redis server named in `config.redis`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use larder_cache::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let config = CacheConfig::from_env()?;
    ///     let cache = CacheClient::connect(config).await?;
    ///     cache.set("greeting", "hello", &[]).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: CacheConfig) -> CacheResult<Self> {
        let store = crate::redis_store::RedisStore::connect(&config.redis).await?;
        Ok(Self::new(store, config))
    }
}

impl<S: CacheStore> CacheClient<S> {
    /// Create a client over `store`.
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    /// Create a client with default configuration and an explicit default
    /// policy.
    ///
    /// ```
    /// use larder_cache::*;
    /// use std::time::Duration;
    ///
    /// let policy = CachePolicy::new()
    ///     .with_expiration(Duration::from_secs(30))
    ///     .with_strategy(Serialization::MessagePack);
    /// let cache = CacheClient::with_policy(InMemoryStore::new(), policy);
    /// assert_eq!(cache.default_policy().strategy(), Serialization::MessagePack);
    /// ```
    pub fn with_policy(store: S, policy: CachePolicy) -> Self {
        let mut client = Self::new(store, CacheConfig::default());
        client.policy = client.policy.merge(&[policy]);
        client
    }

    /// Create a client over a shared store.
    pub fn from_arc(store: Arc<S>, config: CacheConfig) -> Self {
        let policy = config.default_policy();
        Self {
            store,
            config,
            policy,
        }
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The policy overrides are merged over.
    pub fn default_policy(&self) -> CachePolicy {
        self.policy
    }

    fn resolve(&self, overrides: &[CachePolicy]) -> CachePolicy {
        self.policy.merge(overrides)
    }

    fn key(&self, key: &str) -> String {
        self.config.build_key(key)
    }

    fn keys<K: AsRef<str>>(&self, keys: &[K]) -> Vec<String> {
        keys.iter().map(|k| self.key(k.as_ref())).collect()
    }

    async fn bounded<T>(&self, operation: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        match self.config.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| CacheError::Timeout)?,
            None => operation.await,
        }
    }

    // ========== Reads ==========

    /// Get the raw bytes stored at `key`.
    pub async fn get_bytes(&self, key: &str) -> CacheResult<Vec<u8>> {
        let full_key = self.key(key);
        self.bounded(self.store.get(&full_key))
            .await?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Get a string value.
    ///
    /// Fails with [`CacheError::NotFound`] if the key is absent and with
    /// [`CacheError::Parse`] if the stored bytes are not UTF-8.
    pub async fn get_string(&self, key: &str) -> CacheResult<String> {
        let bytes = self.get_bytes(key).await?;
        String::from_utf8(bytes).map_err(|e| CacheError::Parse {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Get an integer value.
    ///
    /// Fails with [`CacheError::NotFound`] if the key is absent and with
    /// [`CacheError::Parse`] if the value is not a decimal integer.
    pub async fn get_int(&self, key: &str) -> CacheResult<i64> {
        let text = self.get_string(key).await?;
        text.parse().map_err(|e: std::num::ParseIntError| CacheError::Parse {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Get a structured value, decoding it with the resolved strategy.
    pub async fn get_object<T: DeserializeOwned>(
        &self,
        key: &str,
        overrides: &[CachePolicy],
    ) -> CacheResult<T> {
        let strategy = self.resolve(overrides).strategy();
        let bytes = self.get_bytes(key).await?;
        strategy.decode(&bytes)
    }

    /// Remaining time-to-live of `key`.
    ///
    /// Returns [`Duration::ZERO`] if the key does not exist or never expires.
    pub async fn remaining_ttl(&self, key: &str) -> CacheResult<Duration> {
        let full_key = self.key(key);
        let ttl = self.bounded(self.store.ttl(&full_key)).await?;
        Ok(ttl.remaining())
    }

    /// Whether at least one of `keys` exists.
    pub async fn exists<K: AsRef<str>>(&self, keys: &[K]) -> CacheResult<bool> {
        if keys.is_empty() {
            return Ok(false);
        }
        let keys = self.keys(keys);
        let count = self.bounded(self.store.exists(&keys)).await?;
        Ok(count > 0)
    }

    /// Get several structured values in one round trip.
    ///
    /// Absent keys are skipped, so the result can be shorter than `keys` and
    /// positions do not line up with the input. Use
    /// [`multi_get_keyed`](Self::multi_get_keyed) to keep the correspondence.
    pub async fn multi_get<T, K>(&self, keys: &[K], overrides: &[CachePolicy]) -> CacheResult<Vec<T>>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        let mut out = Vec::with_capacity(keys.len());
        self.multi_get_into(keys, &mut out, overrides).await?;
        Ok(out)
    }

    /// Like [`multi_get`](Self::multi_get), appending to `out`.
    ///
    /// Values are decoded one at a time in the order the store returns them.
    /// On the first decode error the operation stops; values decoded before
    /// the failing one stay in `out`.
    pub async fn multi_get_into<T, K>(
        &self,
        keys: &[K],
        out: &mut Vec<T>,
        overrides: &[CachePolicy],
    ) -> CacheResult<()>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        if keys.is_empty() {
            return Ok(());
        }
        let strategy = self.resolve(overrides).strategy();
        let keys = self.keys(keys);
        let values = self.bounded(self.store.mget(&keys)).await?;
        decode_present(&keys, values, strategy, out)
    }

    /// Get several structured values in one round trip, aligned with `keys`.
    ///
    /// Position `i` of the result is `None` when `keys[i]` is absent.
    pub async fn multi_get_keyed<T, K>(
        &self,
        keys: &[K],
        overrides: &[CachePolicy],
    ) -> CacheResult<Vec<Option<T>>>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let strategy = self.resolve(overrides).strategy();
        let full_keys = self.keys(keys);
        let values = self.bounded(self.store.mget(&full_keys)).await?;

        full_keys
            .iter()
            .zip(values)
            .map(|(key, value)| {
                value
                    .map(|bytes| {
                        strategy.decode(&bytes).inspect_err(|err| {
                            warn!(key = %key, error = %err, "Failed to decode cached value");
                        })
                    })
                    .transpose()
            })
            .collect()
    }

    /// Get the values referenced by the members of a collection key.
    ///
    /// Returns the member count and the decoded values of the members that
    /// still exist. Fails with [`CacheError::EmptyCollection`] if the
    /// collection has no members.
    pub async fn get_members<T: DeserializeOwned>(
        &self,
        collection: &str,
        overrides: &[CachePolicy],
    ) -> CacheResult<(usize, Vec<T>)> {
        let mut out = Vec::new();
        let count = self.get_members_into(collection, &mut out, overrides).await?;
        Ok((count, out))
    }

    /// Like [`get_members`](Self::get_members), appending to `out`.
    pub async fn get_members_into<T: DeserializeOwned>(
        &self,
        collection: &str,
        out: &mut Vec<T>,
        overrides: &[CachePolicy],
    ) -> CacheResult<usize> {
        let strategy = self.resolve(overrides).strategy();
        let collection_key = self.key(collection);

        self.bounded(async {
            // Members already carry the key prefix.
            let members = self.store.members(&collection_key).await?;
            if members.is_empty() {
                return Err(CacheError::EmptyCollection(collection.to_string()));
            }

            let values = self.store.mget(&members).await?;
            decode_present(&members, values, strategy, out)?;
            Ok(members.len())
        })
        .await
    }

    // ========== Writes ==========

    /// Store a value.
    ///
    /// Raw scalars (strings, booleans, numbers, byte buffers) are stored
    /// verbatim; any other value is encoded with the resolved strategy. See
    /// [`Scalar`](crate::Scalar) for the exact rule.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        overrides: &[CachePolicy],
    ) -> CacheResult<()> {
        let policy = self.resolve(overrides);
        let bytes = stored_bytes(value, policy.strategy())?;
        let command = Command::set(self.key(key), bytes, policy.expiration());
        self.bounded(self.store.execute(command)).await
    }

    /// Store raw bytes verbatim.
    pub async fn set_bytes(
        &self,
        key: &str,
        value: &[u8],
        overrides: &[CachePolicy],
    ) -> CacheResult<()> {
        let policy = self.resolve(overrides);
        let command = Command::set(self.key(key), value.to_vec(), policy.expiration());
        self.bounded(self.store.execute(command)).await
    }

    /// Remove keys. Absent keys are ignored.
    pub async fn delete<K: AsRef<str>>(&self, keys: &[K]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let command = Command::delete(self.keys(keys));
        self.bounded(self.store.execute(command)).await
    }

    /// Remove every key matching the glob `pattern`.
    ///
    /// The keyspace is walked incrementally with `SCAN`, matches are
    /// collected, then removed with one pipelined delete. Keys created after
    /// the scan passed their position may survive. Returns the number of keys
    /// submitted for deletion; nothing is sent when no key matches.
    pub async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<usize> {
        let pattern = self.key(pattern);
        let scan_count = self.config.scan_count;

        self.bounded(async {
            let mut matched = BTreeSet::new();
            let mut cursor = 0;
            loop {
                let page = self.store.scan(cursor, &pattern, scan_count).await?;
                matched.extend(page.keys);
                cursor = page.cursor;
                if cursor == 0 {
                    break;
                }
            }

            if matched.is_empty() {
                debug!(pattern = %pattern, "No keys matched pattern");
                return Ok(0);
            }

            let count = matched.len();
            let mut batch = Batch::pipeline();
            batch.push(Command::delete(matched));
            self.store.submit(batch).await?;

            debug!(pattern = %pattern, deleted = count, "Deleted keys by pattern");
            Ok(count)
        })
        .await
    }

    /// Store several values in one pipelined round trip.
    ///
    /// Every value is encoded with the resolved strategy, scalars included.
    /// If any value fails to encode nothing is sent.
    pub async fn set_multiple<T: Serialize>(
        &self,
        data: &[DataSet<T>],
        overrides: &[CachePolicy],
    ) -> CacheResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let policy = self.resolve(overrides);
        let strategy = policy.strategy();
        let expiration = policy.expiration();

        let commands = data
            .iter()
            .map(|entry| {
                let bytes = strategy.encode(&entry.value)?;
                Ok(Command::set(self.key(&entry.key), bytes, expiration))
            })
            .collect::<CacheResult<Vec<_>>>()?;

        let mut batch = Batch::pipeline();
        batch.extend(commands);

        debug!(entries = data.len(), strategy = %strategy, "Setting multiple keys");
        self.bounded(self.store.submit(batch)).await
    }

    /// Store values and register their keys as members of `collection`,
    /// atomically.
    ///
    /// In one transaction every entry is stored (raw scalars verbatim,
    /// other values encoded, as in [`set`](Self::set)), every key is added
    /// to the collection set, and the collection's expiration is set to the
    /// resolved expiration. Without an expiration the collection is made
    /// persistent, matching its members.
    pub async fn set_members<T: Serialize>(
        &self,
        collection: &str,
        data: &[DataSet<T>],
        overrides: &[CachePolicy],
    ) -> CacheResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let policy = self.resolve(overrides);
        let strategy = policy.strategy();
        let expiration = policy.expiration();

        let mut batch = Batch::transaction();
        let mut members = Vec::with_capacity(data.len());
        for entry in data {
            let key = self.key(&entry.key);
            let bytes = stored_bytes(&entry.value, strategy)?;
            batch.push(Command::set(key.clone(), bytes, expiration));
            members.push(key);
        }

        let collection_key = self.key(collection);
        batch.push(Command::AddMembers {
            key: collection_key.clone(),
            members,
        });
        batch.push(match expiration {
            Some(expiration) => Command::Expire {
                key: collection_key,
                expiration,
            },
            None => Command::Persist {
                key: collection_key,
            },
        });

        debug!(collection = %collection, entries = data.len(), "Setting collection members");
        self.bounded(self.store.submit(batch)).await
    }

    /// Remove a collection key together with every member it references.
    ///
    /// Returns the number of member keys removed. A missing collection is a
    /// no-op.
    pub async fn invalidate_collection(&self, collection: &str) -> CacheResult<usize> {
        let collection_key = self.key(collection);

        self.bounded(async {
            let members = self.store.members(&collection_key).await?;
            if members.is_empty() {
                return Ok(0);
            }

            let count = members.len();
            let mut batch = Batch::transaction();
            batch.push(Command::delete(
                members.into_iter().chain(std::iter::once(collection_key.clone())),
            ));
            self.store.submit(batch).await?;

            debug!(collection = %collection, members = count, "Invalidated collection");
            Ok(count)
        })
        .await
    }
}

fn decode_present<T: DeserializeOwned>(
    keys: &[String],
    values: Vec<Option<Vec<u8>>>,
    strategy: Serialization,
    out: &mut Vec<T>,
) -> CacheResult<()> {
    for (key, value) in keys.iter().zip(values) {
        let Some(bytes) = value else {
            continue;
        };
        match strategy.decode(&bytes) {
            Ok(decoded) => out.push(decoded),
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to decode cached value");
                return Err(err);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u32,
    }

    fn client(config: CacheConfig) -> CacheClient<InMemoryStore> {
        CacheClient::new(InMemoryStore::new(), config)
    }

    #[tokio::test]
    async fn test_overrides_pick_strategy_per_call() {
        let cache = client(CacheConfig::default());
        let msgpack = [CachePolicy::from(Serialization::MessagePack)];

        cache.set("item", &Item { id: 1 }, &msgpack).await.unwrap();

        assert!(cache.get_object::<Item>("item", &[]).await.is_err());
        assert_eq!(
            cache.get_object::<Item>("item", &msgpack).await.unwrap(),
            Item { id: 1 }
        );
    }

    #[tokio::test]
    async fn test_prefix_applies_to_every_key() {
        let cache = client(CacheConfig::default().with_key_prefix("svc"));
        cache.set("a", "1", &[]).await.unwrap();

        assert_eq!(
            cache.store().get("svc:a").await.unwrap(),
            Some(b"1".to_vec())
        );
        assert!(cache.exists(&["a"]).await.unwrap());

        cache
            .set_members("group", &[DataSet::new("b", Item { id: 2 })], &[])
            .await
            .unwrap();
        assert_eq!(
            cache.store().members("svc:group").await.unwrap(),
            vec!["svc:b".to_string()]
        );

        let (count, items) = cache.get_members::<Item>("group", &[]).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(items, vec![Item { id: 2 }]);

        assert_eq!(cache.delete_by_pattern("*").await.unwrap(), 3);
        assert!(cache.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_decode_present_keeps_earlier_values() {
        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let values = vec![
            Some(br#"{"id":1}"#.to_vec()),
            Some(b"oops".to_vec()),
            Some(br#"{"id":3}"#.to_vec()),
        ];
        let mut out: Vec<Item> = Vec::new();

        let err = decode_present(&keys, values, Serialization::Json, &mut out).unwrap_err();

        assert!(matches!(err, CacheError::Deserialization(_)));
        assert_eq!(out, vec![Item { id: 1 }]);
    }

    #[tokio::test]
    async fn test_empty_inputs_make_no_round_trips() {
        let cache = client(CacheConfig::default());
        let none: [&str; 0] = [];

        assert!(!cache.exists(&none).await.unwrap());
        cache.delete(&none).await.unwrap();
        assert!(cache.multi_get::<Item, _>(&none, &[]).await.unwrap().is_empty());
        cache.set_multiple::<Item>(&[], &[]).await.unwrap();
        cache.set_members::<Item>("c", &[], &[]).await.unwrap();

        assert_eq!(cache.store().stats().round_trips, 0);
    }
}
