//! Recency Module
//!
//! Least-recently-used ordering of keys for memory store eviction.

use std::collections::{BTreeMap, HashMap};

// == Recency Tracker ==
/// Orders keys by last use.
///
/// Every touch stamps the key with a fresh sequence number; the smallest
/// stamp is the least recently used key.
#[derive(Debug, Default)]
pub struct RecencyTracker {
    /// Stamp -> key, oldest first
    by_stamp: BTreeMap<u64, String>,
    /// Key -> current stamp
    stamps: HashMap<String, u64>,
    next_stamp: u64,
}

impl RecencyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks `key` as the most recently used.
    pub fn touch(&mut self, key: &str) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;

        match self.stamps.get_mut(key) {
            Some(old) => {
                self.by_stamp.remove(old);
                *old = stamp;
            }
            None => {
                self.stamps.insert(key.to_string(), stamp);
            }
        }
        self.by_stamp.insert(stamp, key.to_string());
    }

    // == Remove ==
    /// Stops tracking `key`.
    pub fn remove(&mut self, key: &str) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.by_stamp.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.by_stamp.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    /// Returns the least recently used key without removing it.
    #[cfg(test)]
    fn peek_oldest(&self) -> Option<&str> {
        self.by_stamp.first_key_value().map(|(_, key)| key.as_str())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.stamps.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, key: &str) -> bool {
        self.stamps.contains_key(key)
    }
}
