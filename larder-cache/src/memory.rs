//! In-process store with Redis-like semantics.

use crate::error::{CacheError, CacheResult};
use crate::store::{Batch, CacheStore, Command, ScanPage, Ttl};
use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const DEFAULT_SCAN_COUNT: usize = 10;

/// Store that keeps strings and sets in a process-local map.
///
/// Expired entries are dropped lazily when touched. Batches are applied
/// under a single write lock, so concurrent readers never observe a batch
/// half-applied. Transactional batches are type-checked before any command
/// is applied, so a rejected transaction leaves no trace. This is stricter
/// than [`RedisStore`](crate::RedisStore); see [`Batch::transaction`].
#[derive(Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<HashMap<String, Entry>>>,
    stats: Arc<Counters>,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    Set(BTreeSet<String>),
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

#[derive(Default)]
struct Counters {
    round_trips: AtomicU64,
    commands: AtomicU64,
}

/// Traffic observed by an [`InMemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Calls made to the store, reads and writes alike.
    pub round_trips: u64,
    /// Write commands applied, counting each command of a batch.
    pub commands: u64,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Traffic counters since creation.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            round_trips: self.stats.round_trips.load(Ordering::Relaxed),
            commands: self.stats.commands.load(Ordering::Relaxed),
        }
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every key.
    pub async fn clear(&self) {
        self.data.write().await.clear();
    }

    /// Drop entries whose expiration has passed.
    pub async fn purge_expired(&self) -> usize {
        let mut data = self.data.write().await;
        let now = Instant::now();
        let before = data.len();
        data.retain(|_, entry| entry.is_live(now));
        before - data.len()
    }

    fn round_trip(&self) {
        self.stats.round_trips.fetch_add(1, Ordering::Relaxed);
    }

    fn live<'a>(data: &'a HashMap<String, Entry>, key: &str, now: Instant) -> Option<&'a Entry> {
        data.get(key).filter(|entry| entry.is_live(now))
    }

    fn check(data: &HashMap<String, Entry>, command: &Command, now: Instant) -> CacheResult<()> {
        if let Command::AddMembers { key, .. } = command
            && let Some(Entry {
                value: Value::Bytes(_),
                ..
            }) = Self::live(data, key, now)
        {
            return Err(CacheError::Store(WRONG_TYPE.to_string()));
        }
        Ok(())
    }

    fn apply(data: &mut HashMap<String, Entry>, command: Command, now: Instant) -> CacheResult<()> {
        Self::check(data, &command, now)?;

        match command {
            Command::Set {
                key,
                value,
                expiration,
            } => {
                let entry = Entry {
                    value: Value::Bytes(value),
                    expires_at: expiration.and_then(|d| expiry(now, d)),
                };
                data.insert(key, entry);
            }
            Command::Delete { keys } => {
                for key in keys {
                    data.remove(&key);
                }
            }
            Command::AddMembers { key, members } => {
                if data.get(&key).is_some_and(|entry| !entry.is_live(now)) {
                    data.remove(&key);
                }
                let entry = data.entry(key).or_insert_with(|| Entry {
                    value: Value::Set(BTreeSet::new()),
                    expires_at: None,
                });
                if let Value::Set(set) = &mut entry.value {
                    set.extend(members);
                }
            }
            Command::Expire { key, expiration } => {
                if let Some(entry) = data.get_mut(&key).filter(|entry| entry.is_live(now)) {
                    entry.expires_at = expiry(now, expiration);
                }
            }
            Command::Persist { key } => {
                if let Some(entry) = data.get_mut(&key).filter(|entry| entry.is_live(now)) {
                    entry.expires_at = None;
                }
            }
        }
        Ok(())
    }
}

/// Deadline `expiration` from `now`. Beyond what `Instant` can represent the
/// entry never expires.
fn expiry(now: Instant, expiration: Duration) -> Option<Instant> {
    now.checked_add(expiration)
}

fn matcher(pattern: &str) -> CacheResult<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| CacheError::Store(format!("invalid pattern '{}': {}", pattern, e)))
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.round_trip();
        let data = self.data.read().await;
        match Self::live(&data, key, Instant::now()) {
            Some(Entry {
                value: Value::Bytes(bytes),
                ..
            }) => Ok(Some(bytes.clone())),
            Some(_) => Err(CacheError::Store(WRONG_TYPE.to_string())),
            None => Ok(None),
        }
    }

    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>> {
        self.round_trip();
        let data = self.data.read().await;
        let now = Instant::now();
        Ok(keys
            .iter()
            .map(|key| match Self::live(&data, key, now) {
                Some(Entry {
                    value: Value::Bytes(bytes),
                    ..
                }) => Some(bytes.clone()),
                _ => None,
            })
            .collect())
    }

    async fn ttl(&self, key: &str) -> CacheResult<Ttl> {
        self.round_trip();
        let data = self.data.read().await;
        let now = Instant::now();
        Ok(match Self::live(&data, key, now) {
            None => Ttl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => Ttl::Persistent,
            Some(Entry {
                expires_at: Some(exp),
                ..
            }) => Ttl::Expires(*exp - now),
        })
    }

    async fn exists(&self, keys: &[String]) -> CacheResult<u64> {
        self.round_trip();
        let data = self.data.read().await;
        let now = Instant::now();
        Ok(keys
            .iter()
            .filter(|key| Self::live(&data, key, now).is_some())
            .count() as u64)
    }

    async fn members(&self, key: &str) -> CacheResult<Vec<String>> {
        self.round_trip();
        let data = self.data.read().await;
        match Self::live(&data, key, Instant::now()) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(CacheError::Store(WRONG_TYPE.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage> {
        self.round_trip();
        let matcher = matcher(pattern)?;
        let count = if count == 0 { DEFAULT_SCAN_COUNT } else { count };

        let data = self.data.read().await;
        let now = Instant::now();
        let mut keys: Vec<&String> = data
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key)
            .collect();
        keys.sort();

        let start = (cursor as usize).min(keys.len());
        let end = start.saturating_add(count).min(keys.len());
        let page = keys[start..end]
            .iter()
            .filter(|key| matcher.is_match(key.as_str()))
            .map(|key| (*key).clone())
            .collect();

        Ok(ScanPage {
            cursor: if end >= keys.len() { 0 } else { end as u64 },
            keys: page,
        })
    }

    async fn execute(&self, command: Command) -> CacheResult<()> {
        self.round_trip();
        let mut data = self.data.write().await;
        self.stats.commands.fetch_add(1, Ordering::Relaxed);
        Self::apply(&mut data, command, Instant::now())
    }

    async fn submit(&self, batch: Batch) -> CacheResult<()> {
        self.round_trip();
        let mut data = self.data.write().await;
        let now = Instant::now();

        if batch.is_atomic() {
            for command in batch.commands() {
                Self::check(&data, command, now)?;
            }
        }

        self.stats
            .commands
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        // A pipeline keeps going after a failed command and reports the first error.
        let mut first_error = None;
        for command in batch.into_commands() {
            if let Err(err) = Self::apply(&mut data, command, now) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
