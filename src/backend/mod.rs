//! Backend Module
//!
//! Byte-oriented stores the cache facade delegates to.
//!
//! Two variants are provided: [`MemoryBackend`] keeps entries in process and
//! [`RedisBackend`] keeps them in a Redis server.

pub mod memory;
pub mod distributed;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;
use crate::options::EntryOptions;

pub use self::memory::{MemoryBackend, MemorySettings};
pub use self::distributed::{DistributedSettings, RedisBackend};

/// Which backend variant is behind a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Memory,
    Distributed,
}

/// Byte-oriented key/value store with expiration.
///
/// Implementations must be safe to call from many tasks at once. A missing
/// key is `Ok(None)`, never an error.
#[async_trait]
pub trait CacheBackend: Debug + Send + Sync {
    /// Returns the payload stored at `key`, or `None` on a miss.
    ///
    /// Reading an entry with a sliding expiration restarts its window.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` at `key`, replacing any existing entry.
    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<()>;

    /// Removes the entry at `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Restarts the sliding window of `key` without reading the payload.
    async fn refresh(&self, key: &str) -> Result<()>;

    /// Identifies the variant.
    fn kind(&self) -> BackendKind;
}
