//! Session store bridge
//!
//! A key-value store shared by every tab of the client, plus the mutation
//! notifications other tabs use to react to writes. A tab never observes its
//! own writes through [`StorageEvents`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreResult;

/// Well-known keys persisted by the client
pub mod keys {
    /// Bearer credential
    pub const TOKEN: &str = "token";
    /// Identifier of the logged-in user
    pub const USER_ID: &str = "userId";
    /// Display name of the logged-in user
    pub const USER_NAME: &str = "userName";
    /// Transient cross-tab logout signal
    pub const LOGOUT: &str = "logout";

    /// Session fields cleared together on logout
    pub const SESSION_FIELDS: [&str; 3] = [TOKEN, USER_ID, USER_NAME];
}

/// Capacity of the mutation event channel of a store
pub const EVENT_CAPACITY: usize = 64;

/// Identifier of one tab (one controller instance) sharing a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(Uuid);

impl TabId {
    /// Allocate a fresh tab identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single key mutation, delivered to every subscriber of the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed
    pub new_value: Option<String>,
    pub origin: TabId,
}

/// Backend of the shared key-value store
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value and notify subscribers
    async fn set(&self, key: &str, value: &str, origin: TabId) -> StoreResult<()>;

    /// Delete a value; subscribers are only notified when the key existed
    async fn remove(&self, key: &str, origin: TabId) -> StoreResult<()>;

    /// Subscribe to every mutation, including the caller's own
    fn events(&self) -> broadcast::Receiver<StorageEvent>;
}

/// A tab's view onto a shared store
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn SharedStore>,
    tab: TabId,
}

impl StoreHandle {
    /// Open a new tab on the given store
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self {
            store,
            tab: TabId::new(),
        }
    }

    /// Identifier of this tab
    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Open a sibling tab on the same backing store
    pub fn sibling(&self) -> Self {
        Self::new(self.store.clone())
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.store.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.store.set(key, value, self.tab).await
    }

    pub async fn remove(&self, key: &str) -> StoreResult<()> {
        self.store.remove(key, self.tab).await
    }

    /// Mutation notifications caused by other tabs
    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            rx: self.store.events(),
            tab: self.tab,
        }
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle").field("tab", &self.tab).finish()
    }
}

/// Stream of mutations made by tabs other than the subscriber
pub struct StorageEvents {
    rx: broadcast::Receiver<StorageEvent>,
    tab: TabId,
}

impl StorageEvents {
    /// Wait for the next foreign mutation; `None` once the store is gone
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == self.tab => continue,
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Tab {} lagged behind by {} storage events", self.tab, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// In-process store shared by tabs living in the same process
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn notify(&self, event: StorageEvent) {
        // No receivers simply means no tab is listening yet
        if self.events.send(event).is_err() {
            debug!("Storage event dropped, no subscribers");
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, origin: TabId) -> StoreResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        self.notify(StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            origin,
        });
        Ok(())
    }

    async fn remove(&self, key: &str, origin: TabId) -> StoreResult<()> {
        let existed = self.entries.lock().remove(key).is_some();
        if existed {
            self.notify(StorageEvent {
                key: key.to_string(),
                new_value: None,
                origin,
            });
        }
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
