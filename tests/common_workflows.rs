//! Integration tests for common Larder workflows.
//!
//! These tests verify that the most common use cases work correctly.

#![cfg(feature = "cache")]

use larder::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user_id: u64,
    roles: Vec<String>,
}

fn session(user_id: u64) -> Session {
    Session {
        user_id,
        roles: vec!["reader".to_string()],
    }
}

// =============================================================================
// Single Key Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_read_through_workflow() {
    let config = CacheConfig::default()
        .with_key_prefix("app")
        .with_default_expiration(Duration::from_secs(300));
    let cache = CacheClient::new(InMemoryStore::new(), config);

    // Miss, load, store
    let cached = cache.get_object::<Session>("session:1", &[]).await;
    let value = match cached {
        Ok(value) => value,
        Err(err) if err.is_not_found() => {
            let loaded = session(1);
            cache.set("session:1", &loaded, &[]).await.unwrap();
            loaded
        }
        Err(err) => panic!("unexpected error: {}", err),
    };

    // Hit
    let hit: Session = cache.get_object("session:1", &[]).await.unwrap();
    assert_eq!(hit, value);

    tokio::time::advance(Duration::from_secs(301)).await;
    assert!(
        cache
            .get_object::<Session>("session:1", &[])
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_counter_workflow() {
    let cache = CacheClient::new(InMemoryStore::new(), CacheConfig::default());

    cache.set("visits", &0, &[]).await.unwrap();
    let visits = cache.get_int("visits").await.unwrap();
    cache.set("visits", &(visits + 1), &[]).await.unwrap();

    assert_eq!(cache.get_int("visits").await.unwrap(), 1);
}

// =============================================================================
// Bulk and Collection Tests
// =============================================================================

#[tokio::test]
async fn test_bulk_warmup_and_pattern_purge() {
    let cache = CacheClient::new(InMemoryStore::new(), CacheConfig::default());
    let msgpack = [CachePolicy::from(Serialization::MessagePack)];

    let data: Vec<DataSet<Session>> = (1..=3)
        .map(|id| DataSet::new(format!("session:{}", id), session(id)))
        .collect();
    cache.set_multiple(&data, &msgpack).await.unwrap();

    let sessions: Vec<Option<Session>> = cache
        .multi_get_keyed(&["session:1", "session:9", "session:3"], &msgpack)
        .await
        .unwrap();
    assert_eq!(sessions[0], Some(session(1)));
    assert_eq!(sessions[1], None);
    assert_eq!(sessions[2], Some(session(3)));

    assert_eq!(cache.delete_by_pattern("session:*").await.unwrap(), 3);
    assert!(!cache.exists(&["session:1", "session:2", "session:3"]).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_collection_lifecycle() {
    let cache = CacheClient::with_policy(
        InMemoryStore::new(),
        CachePolicy::new().with_expiration(Duration::from_secs(120)),
    );

    cache
        .set_members(
            "org:1:sessions",
            &[
                DataSet::new("session:1", session(1)),
                DataSet::new("session:2", session(2)),
            ],
            &[],
        )
        .await
        .unwrap();

    assert_eq!(
        cache.remaining_ttl("org:1:sessions").await.unwrap(),
        Duration::from_secs(120)
    );

    let (count, sessions) = cache
        .get_members::<Session>("org:1:sessions", &[])
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(sessions.len(), 2);

    assert_eq!(cache.invalidate_collection("org:1:sessions").await.unwrap(), 2);
    assert!(matches!(
        cache.get_members::<Session>("org:1:sessions", &[]).await,
        Err(CacheError::EmptyCollection(_))
    ));
}
