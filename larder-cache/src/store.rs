//! The key-value store beneath the cache client.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// A write command understood by every [`CacheStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `value` at `key`, replacing any previous value and expiration.
    Set {
        key: String,
        value: Vec<u8>,
        expiration: Option<Duration>,
    },
    /// Remove keys. Absent keys are ignored.
    Delete { keys: Vec<String> },
    /// Add members to the set at `key`, creating it if needed.
    AddMembers { key: String, members: Vec<String> },
    /// Set the time-to-live of `key`.
    Expire { key: String, expiration: Duration },
    /// Remove the time-to-live of `key`.
    Persist { key: String },
}

impl Command {
    /// Build a `Set` command.
    pub fn set(key: impl Into<String>, value: Vec<u8>, expiration: Option<Duration>) -> Self {
        Command::Set {
            key: key.into(),
            value,
            expiration,
        }
    }

    /// Build a `Delete` command.
    pub fn delete<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Command::Delete {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// Commands sent to the store in a single round trip.
///
/// An atomic batch is applied as a transaction: no other client's command
/// runs between its commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<Command>,
    atomic: bool,
}

impl Batch {
    /// A plain pipeline.
    pub fn pipeline() -> Self {
        Self {
            commands: Vec::new(),
            atomic: false,
        }
    }

    /// A transactional pipeline.
    ///
    /// Redis executes `MULTI`/`EXEC` without rollback: when one command fails
    /// at `EXEC` (for example `WRONGTYPE`), the others still take effect and
    /// the error is reported. [`InMemoryStore`](crate::InMemoryStore) checks
    /// command types before applying any and rejects the whole batch.
    pub fn transaction() -> Self {
        Self {
            commands: Vec::new(),
            atomic: true,
        }
    }

    /// Append a command.
    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Whether the batch must commit atomically.
    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Commands in submission order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Consume the batch, yielding its commands.
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

impl Extend<Command> for Batch {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.commands.extend(iter);
    }
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key does not exist.
    Missing,
    /// The key exists without an expiration.
    Persistent,
    /// The key expires after the given duration.
    Expires(Duration),
}

impl Ttl {
    /// Interpret a Redis `PTTL` reply.
    pub fn from_millis(reply: i64) -> Self {
        match reply {
            -2 => Ttl::Missing,
            millis if millis >= 0 => Ttl::Expires(Duration::from_millis(millis as u64)),
            _ => Ttl::Persistent,
        }
    }

    /// The remaining duration, or zero when the key is missing or persistent.
    pub fn remaining(&self) -> Duration {
        match self {
            Ttl::Expires(d) => *d,
            Ttl::Missing | Ttl::Persistent => Duration::ZERO,
        }
    }
}

/// One page of an incremental keyspace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; `0` once the scan is complete.
    pub cursor: u64,
    /// Keys matched on this page. A key may be reported more than once
    /// across pages.
    pub keys: Vec<String>,
}

/// Key-value store used by [`CacheClient`](crate::CacheClient).
///
/// Implementations must be safe to share between tasks; the client holds one
/// instance behind an `Arc` and calls it concurrently.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the bytes stored at `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Get several keys in one round trip.
    ///
    /// The reply has one entry per requested key, `None` for absent keys.
    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>>;

    /// Get the remaining lifetime of `key`.
    async fn ttl(&self, key: &str) -> CacheResult<Ttl>;

    /// Count how many of `keys` exist.
    async fn exists(&self, keys: &[String]) -> CacheResult<u64>;

    /// Get the members of the set at `key`. Absent keys have no members.
    async fn members(&self, key: &str) -> CacheResult<Vec<String>>;

    /// Fetch one page of keys matching the glob `pattern`, starting at `cursor`.
    ///
    /// `count` is a hint for the amount of work done per call.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage>;

    /// Execute a single command.
    async fn execute(&self, command: Command) -> CacheResult<()>;

    /// Execute every command of `batch` in one round trip.
    async fn submit(&self, batch: Batch) -> CacheResult<()>;
}
