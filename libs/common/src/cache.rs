//! Redis-backed session store
//!
//! Lets tabs living in separate processes share session state. Values are
//! stored under a namespace prefix and every mutation is published as JSON on
//! a pub/sub channel; one listener task per store fans the channel out to
//! local subscribers.

use async_trait::async_trait;
use futures::StreamExt;
use redis::{AsyncCommands, Client};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::store::{EVENT_CAPACITY, SharedStore, StorageEvent, TabId};

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Prefix applied to every key and to the event channel
    pub namespace: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: namespace.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn events_channel(&self) -> String {
        format!("{}:events", self.namespace)
    }
}

/// Shared store backed by Redis
pub struct RedisStore {
    client: Client,
    config: RedisConfig,
    events: broadcast::Sender<StorageEvent>,
    listener: JoinHandle<()>,
}

impl RedisStore {
    /// Connect to Redis and start listening for mutation events
    pub async fn connect(config: RedisConfig) -> StoreResult<Self> {
        let client = Client::open(config.url.clone())?;
        let channel = config.events_channel();

        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(&channel).await?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let sender = events.clone();
        let listener = tokio::spawn(async move {
            let mut messages = Box::pin(pubsub.on_message());
            while let Some(message) = messages.next().await {
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Unreadable storage event payload: {}", e);
                        continue;
                    }
                };
                match serde_json::from_str::<StorageEvent>(&payload) {
                    Ok(event) => {
                        let _ = sender.send(event);
                    }
                    Err(e) => warn!("Malformed storage event: {}", e),
                }
            }
            info!("Storage event stream closed");
        });

        info!(
            "Redis store connected to {} (namespace {})",
            config.url, config.namespace
        );

        Ok(Self {
            client,
            config,
            events,
            listener,
        })
    }

    async fn get_connection(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    async fn publish(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        event: &StorageEvent,
    ) -> StoreResult<()> {
        let payload = serde_json::to_string(event)?;
        let _: i64 = conn.publish(self.config.events_channel(), payload).await?;
        Ok(())
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> StoreResult<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(self.config.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, origin: TabId) -> StoreResult<()> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.set(self.config.key(key), value).await?;

        let event = StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            origin,
        };
        self.publish(&mut conn, &event).await
    }

    async fn remove(&self, key: &str, origin: TabId) -> StoreResult<()> {
        let mut conn = self.get_connection().await?;
        let removed: u64 = conn.del(self.config.key(key)).await?;
        if removed == 0 {
            return Ok(());
        }

        let event = StorageEvent {
            key: key.to_string(),
            new_value: None,
            origin,
        };
        self.publish(&mut conn, &event).await
    }

    fn events(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

impl Drop for RedisStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
