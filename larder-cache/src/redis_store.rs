//! Redis-backed store.

use crate::error::{CacheError, CacheResult};
use crate::store::{Batch, CacheStore, Command, ScanPage, Ttl};
use async_trait::async_trait;
use larder_redis::RedisConfig;
use redis::{AsyncCommands, Pipeline, aio::ConnectionManager};
use std::future::Future;
use std::time::Duration;

/// Redis store.
///
/// Wraps a multiplexed [`ConnectionManager`]; every call works on a cheap
/// clone of it, so one `RedisStore` serves any number of concurrent callers.
/// Expirations are sent with millisecond precision (`PX`, `PEXPIRE`, `PTTL`).
/// Each round trip is bounded by [`RedisConfig::command_timeout`].
/// Transactional batches run as `MULTI`/`EXEC`, which does not roll back
/// commands that succeeded when another fails at execution.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    command_timeout: Duration,
}

impl RedisStore {
    /// Connect using `config` and verify the connection with `PING`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use larder_cache::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let config = RedisConfig::new("redis://localhost:6379");
    ///     let store = RedisStore::connect(&config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let connection = larder_redis::connect(config).await?;
        Ok(Self {
            connection,
            command_timeout: config.command_timeout,
        })
    }

    /// Wrap an already established connection.
    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self {
            connection,
            command_timeout: RedisConfig::default().command_timeout,
        }
    }

    /// Set the upper bound for a single round trip.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Get the underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    async fn timed<T>(&self, round_trip: impl Future<Output = redis::RedisResult<T>>) -> CacheResult<T> {
        tokio::time::timeout(self.command_timeout, round_trip)
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(CacheError::from)
    }
}

/// Longest expiration sent to Redis. Redis rejects an expiration whose
/// deadline overflows a signed 64-bit millisecond clock.
const MAX_EXPIRE_MILLIS: u64 = (i64::MAX / 2) as u64;

fn millis(duration: Duration) -> u64 {
    // Redis rejects a zero PX/PEXPIRE, round sub-millisecond values up.
    u64::try_from(duration.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(1, MAX_EXPIRE_MILLIS)
}

fn signed_millis(duration: Duration) -> i64 {
    i64::try_from(millis(duration)).unwrap_or(i64::MAX)
}

fn queue(pipe: &mut Pipeline, command: Command) {
    match command {
        Command::Set {
            key,
            value,
            expiration: Some(expiration),
        } => {
            pipe.pset_ex(key, value, millis(expiration)).ignore();
        }
        Command::Set {
            key,
            value,
            expiration: None,
        } => {
            pipe.set(key, value).ignore();
        }
        Command::Delete { keys } => {
            if !keys.is_empty() {
                pipe.del(keys).ignore();
            }
        }
        Command::AddMembers { key, members } => {
            if !members.is_empty() {
                pipe.sadd(key, members).ignore();
            }
        }
        Command::Expire { key, expiration } => {
            pipe.pexpire(key, signed_millis(expiration)).ignore();
        }
        Command::Persist { key } => {
            pipe.persist(key).ignore();
        }
    }
}

fn is_noop(command: &Command) -> bool {
    match command {
        Command::Delete { keys } => keys.is_empty(),
        Command::AddMembers { members, .. } => members.is_empty(),
        _ => false,
    }
}

fn build_pipeline(batch: Batch) -> Pipeline {
    let mut pipe = redis::pipe();
    if batch.is_atomic() {
        pipe.atomic();
    }
    for command in batch.into_commands() {
        queue(&mut pipe, command);
    }
    pipe
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        self.timed(conn.get(key)).await
    }

    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection.clone();
        // Always MGET, so a single key still yields an array reply.
        self.timed(redis::cmd("MGET").arg(keys).query_async(&mut conn))
            .await
    }

    async fn ttl(&self, key: &str) -> CacheResult<Ttl> {
        let mut conn = self.connection.clone();
        let reply: i64 = self.timed(conn.pttl(key)).await?;
        Ok(Ttl::from_millis(reply))
    }

    async fn exists(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        self.timed(conn.exists(keys)).await
    }

    async fn members(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.connection.clone();
        self.timed(conn.smembers(key)).await
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage> {
        let mut conn = self.connection.clone();
        let (cursor, keys): (u64, Vec<String>) = self
            .timed(
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(count.max(1))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(ScanPage { cursor, keys })
    }

    async fn execute(&self, command: Command) -> CacheResult<()> {
        let mut batch = Batch::pipeline();
        batch.push(command);
        self.submit(batch).await
    }

    async fn submit(&self, batch: Batch) -> CacheResult<()> {
        if batch.commands().iter().all(is_noop) {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let pipe = build_pipeline(batch);
        self.timed(pipe.query_async::<()>(&mut conn)).await
    }
}
