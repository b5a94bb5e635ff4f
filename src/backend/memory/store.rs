//! Memory Store Module
//!
//! HashMap storage combined with recency tracking, byte accounting and expiration.

use std::collections::HashMap;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::MemoryEntry;
use super::lru::RecencyTracker;
use super::stats::MemoryStats;
use crate::error::{CacheError, Result};
use crate::options::ResolvedExpiration;

// == Memory Store ==
/// Synchronous core of the memory backend.
///
/// Callers pass the current instant so that expiration follows the tokio
/// clock (and can be driven by `tokio::time::pause` in tests).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, MemoryEntry>,
    recency: RecencyTracker,
    stats: MemoryStats,
    /// Byte budget over all payloads
    size_limit: Option<usize>,
    /// Entry count budget
    max_entries: Option<usize>,
    current_size: usize,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store with optional byte and entry budgets.
    pub fn new(size_limit: Option<usize>, max_entries: Option<usize>) -> Self {
        Self {
            size_limit,
            max_entries,
            ..Self::default()
        }
    }

    // == Set ==
    /// Stores `value` at `key`, replacing any existing entry.
    ///
    /// When a budget would be exceeded, expired entries are purged first and
    /// then least recently used entries are evicted. A payload larger than
    /// the whole byte budget is rejected and the old entry, if any, is kept.
    pub fn set(
        &mut self,
        key: &str,
        value: Vec<u8>,
        expiration: ResolvedExpiration,
        now: Instant,
    ) -> Result<()> {
        let size = value.len();
        if let Some(limit) = self.size_limit {
            if size > limit {
                return Err(CacheError::CapacityExceeded(format!(
                    "payload of {} bytes for key '{}' exceeds the size limit of {} bytes",
                    size, key, limit
                )));
            }
        }
        if self.max_entries == Some(0) {
            return Err(CacheError::CapacityExceeded(
                "memory store is configured to hold no entries".to_string(),
            ));
        }

        self.detach(key);

        if !self.fits(size) {
            self.cleanup_expired(now);
        }
        while !self.fits(size) {
            match self.recency.evict_oldest() {
                Some(evicted) => {
                    if let Some(entry) = self.entries.remove(&evicted) {
                        self.current_size -= entry.size();
                    }
                    self.stats.record_eviction();
                    warn!("Memory cache evicted key '{}' to make room", evicted);
                }
                None => {
                    return Err(CacheError::CapacityExceeded(format!(
                        "no room for key '{}'",
                        key
                    )))
                }
            }
        }

        self.entries
            .insert(key.to_string(), MemoryEntry::new(value, expiration, now));
        self.recency.touch(key);
        self.current_size += size;
        Ok(())
    }

    // == Get ==
    /// Returns a copy of the payload at `key` if it is live.
    ///
    /// Expired entries are removed and counted as misses; a hit restarts the
    /// entry's sliding window.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<Vec<u8>> {
        if self.remove_if_expired(key, now) {
            self.stats.record_miss();
            return None;
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                let value = entry.value.clone();
                self.recency.touch(key);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Refresh ==
    /// Restarts the sliding window of `key`. Returns false if there is no live entry.
    pub fn refresh(&mut self, key: &str, now: Instant) -> bool {
        if self.remove_if_expired(key, now) {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                self.recency.touch(key);
                true
            }
            None => false,
        }
    }

    // == Remove ==
    /// Removes `key`. Returns true if an entry was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.detach(key)
    }

    // == Cleanup Expired ==
    /// Removes every expired entry and returns how many were removed.
    pub fn cleanup_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.detach(key);
        }
        self.stats.record_expirations(expired.len());
        if !expired.is_empty() {
            debug!("Memory cache dropped {} expired entries", expired.len());
        }
        expired.len()
    }

    // == Stats ==
    /// Returns a snapshot of the store's counters.
    pub fn stats(&self) -> MemoryStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.total_bytes = self.current_size;
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently charged against the size budget.
    pub fn size(&self) -> usize {
        self.current_size
    }

    fn fits(&self, incoming: usize) -> bool {
        let size_ok = self
            .size_limit
            .map_or(true, |limit| self.current_size + incoming <= limit);
        let count_ok = self
            .max_entries
            .map_or(true, |max| self.entries.len() < max);
        size_ok && count_ok
    }

    fn remove_if_expired(&mut self, key: &str, now: Instant) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now));
        if expired {
            self.detach(key);
            self.stats.record_expirations(1);
        }
        expired
    }

    fn detach(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.current_size -= entry.size();
                self.recency.remove(key);
                true
            }
            None => false,
        }
    }
}
