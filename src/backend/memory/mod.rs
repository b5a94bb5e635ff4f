//! Memory Backend Module
//!
//! In-process byte store with size accounting, LRU eviction and expiration.

mod entry;
mod lru;
mod stats;
mod store;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{BackendKind, CacheBackend};
use crate::error::Result;
use crate::options::EntryOptions;
use crate::tasks::spawn_expiration_scan;

pub use stats::MemoryStats;
pub use store::MemoryStore;

/// Default interval between background expiration scans, in seconds.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;

// == Memory Settings ==
/// Settings for the memory strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Byte budget over all payloads; unbounded when unset
    pub size_limit: Option<usize>,
    /// Entry count budget; unbounded when unset
    pub max_entries: Option<usize>,
    /// Seconds between background expiration scans
    pub expiration_scan_interval_secs: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            size_limit: None,
            max_entries: None,
            expiration_scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
        }
    }
}

impl MemorySettings {
    pub fn expiration_scan_interval(&self) -> Duration {
        Duration::from_secs(self.expiration_scan_interval_secs)
    }
}

// == Memory Backend ==
/// Shared handle to an in-process [`MemoryStore`].
///
/// Cloning is cheap; clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryBackend {
    /// Creates an unbounded memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a memory backend with the budgets from `settings`.
    pub fn from_settings(settings: &MemorySettings) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(
                settings.size_limit,
                settings.max_entries,
            ))),
        }
    }

    /// Returns a snapshot of the store's counters.
    pub async fn stats(&self) -> MemoryStats {
        self.store.read().await.stats()
    }

    /// Removes every expired entry now.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired(Instant::now())
    }

    /// Starts a background task that drops expired entries every `interval`.
    ///
    /// The task stops on its own once every handle to this store is dropped.
    pub fn spawn_expiration_scan(&self, interval: Duration) -> JoinHandle<()> {
        spawn_expiration_scan(Arc::downgrade(&self.store), interval)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.store.write().await.get(key, Instant::now());
        match &value {
            Some(bytes) => debug!("Memory cache hit for key '{}' ({} bytes)", key, bytes.len()),
            None => debug!("Memory cache miss for key '{}'", key),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<()> {
        let expiration = options.resolve(Utc::now())?;
        let size = value.len();
        self.store
            .write()
            .await
            .set(key, value, expiration, Instant::now())?;
        debug!("Memory cache stored key '{}' ({} bytes)", key, size);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let removed = self.store.write().await.remove(key);
        debug!("Memory cache removed key '{}': {}", key, removed);
        Ok(())
    }

    async fn refresh(&self, key: &str) -> Result<()> {
        self.store.write().await.refresh(key, Instant::now());
        Ok(())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}
