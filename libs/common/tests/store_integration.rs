//! Integration tests for the shared session stores
//!
//! The Redis tests need a server on localhost:6379 and are ignored by
//! default; run them with `cargo test -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use common::{
    MemoryStore, SharedStore, StoreHandle,
    cache::{RedisConfig, RedisStore},
    keys,
};

/// Tabs of one process see each other's writes and notifications
#[tokio::test]
async fn test_memory_store_cross_tab_notification() -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let tab_a = StoreHandle::new(store.clone());
    let tab_b = StoreHandle::new(store);
    let mut tab_b_events = tab_b.subscribe();

    tab_a.set(keys::LOGOUT, "1700000000000").await?;

    let event = tokio::time::timeout(Duration::from_secs(1), tab_b_events.recv())
        .await?
        .expect("event delivered");
    assert_eq!(event.key, keys::LOGOUT);
    assert_eq!(event.origin, tab_a.tab());
    assert_eq!(
        tab_b.get(keys::LOGOUT).await?,
        Some("1700000000000".to_string())
    );

    Ok(())
}

/// Two processes sharing Redis see each other's writes and notifications
#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_store_cross_process_notification() -> Result<(), Box<dyn std::error::Error>> {
    let namespace = format!("labtrac-it-{}", uuid_suffix());
    let first = RedisStore::connect(RedisConfig::new("redis://localhost:6379", &namespace)).await?;
    let second = RedisStore::connect(RedisConfig::new("redis://localhost:6379", &namespace)).await?;
    assert!(first.health_check().await?, "Redis health check failed");

    let tab_a = StoreHandle::new(Arc::new(first));
    let tab_b = StoreHandle::new(Arc::new(second));
    let mut tab_b_events = tab_b.subscribe();

    tab_a.set(keys::TOKEN, "integration-token").await?;
    let event = tokio::time::timeout(Duration::from_secs(2), tab_b_events.recv())
        .await?
        .expect("event delivered");
    assert_eq!(event.key, keys::TOKEN);
    assert_eq!(event.new_value.as_deref(), Some("integration-token"));
    assert_eq!(
        tab_b.get(keys::TOKEN).await?,
        Some("integration-token".to_string())
    );

    // Clean up - delete the key
    tab_a.remove(keys::TOKEN).await?;
    assert_eq!(tab_b.get(keys::TOKEN).await?, None, "Redis delete failed");

    Ok(())
}

fn uuid_suffix() -> String {
    common::TabId::new().to_string()
}
