//! Common library for the LabTrac client
//!
//! This crate provides functionality shared by the session and print
//! services: the shared session store with its cross-tab mutation
//! notifications, the Redis-backed store used across processes, error
//! types and configuration loading.

pub mod cache;
pub mod config;
pub mod error;
pub mod store;

pub use store::{MemoryStore, SharedStore, StorageEvent, StorageEvents, StoreHandle, TabId, keys};

use std::sync::Arc;

use tracing::info;

use crate::cache::{RedisConfig, RedisStore};
use crate::config::LabTracConfig;
use crate::error::StoreResult;

/// Build the shared store described by the configuration
///
/// ```rust,no_run
/// use common::{config::LabTracConfig, open_store, StoreHandle};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = LabTracConfig::from_env()?;
///     let tab = StoreHandle::new(open_store(&config).await?);
///     println!("Opened tab {}", tab.tab());
///     Ok(())
/// }
/// ```
pub async fn open_store(config: &LabTracConfig) -> StoreResult<Arc<dyn SharedStore>> {
    match &config.redis_url {
        Some(url) => {
            let store =
                RedisStore::connect(RedisConfig::new(url.clone(), config.store_namespace.clone()))
                    .await?;
            Ok(Arc::new(store))
        }
        None => {
            info!("No Redis URL configured, using in-memory session store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
