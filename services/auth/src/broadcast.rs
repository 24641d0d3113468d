//! Cross-tab logout signalling
//!
//! A tab that ends its session writes a timestamp under the `logout` key.
//! Every other tab sharing the store receives the mutation, runs its own
//! logout and clears the key so a tab opened later never sees a stale signal.

use std::future::Future;

use chrono::Utc;
use common::error::StoreResult;
use common::{StoreHandle, keys};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Logout signal channel of one tab
#[derive(Debug, Clone)]
pub struct AuthBroadcast {
    store: StoreHandle,
}

impl AuthBroadcast {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Tell every other tab that this tab logged out
    pub async fn signal_logout(&self) -> StoreResult<()> {
        let stamp = Utc::now().timestamp_millis().to_string();
        debug!("Tab {} signalling logout at {}", self.store.tab(), stamp);
        self.store.set(keys::LOGOUT, &stamp).await
    }

    /// Run `callback` each time another tab signals a logout
    ///
    /// The listener is registered before this returns, so signals written
    /// afterwards are never missed.
    pub fn on_external_logout<F, Fut>(&self, callback: F) -> Subscription
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut events = self.store.subscribe();
        let store = self.store.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                // Clearing the key is itself a mutation; only writes count
                if event.key != keys::LOGOUT || event.new_value.is_none() {
                    continue;
                }

                debug!("Tab {} received logout from {}", store.tab(), event.origin);
                callback().await;

                if let Err(e) = store.remove(keys::LOGOUT).await {
                    warn!("Failed to clear logout signal: {}", e);
                }
            }
        });

        Subscription { task }
    }
}

/// Registration returned by [`AuthBroadcast::on_external_logout`]
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
