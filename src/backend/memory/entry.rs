//! Memory Entry Module
//!
//! A stored payload with its expiration bookkeeping.

use tokio::time::Instant;

use crate::options::ResolvedExpiration;

// == Memory Entry ==
/// A single payload held by the memory store.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    /// The stored bytes
    pub value: Vec<u8>,
    /// When the entry was written
    pub created_at: Instant,
    /// When the entry was last read or refreshed
    pub last_accessed: Instant,
    /// Resolved expiration policy
    pub expiration: ResolvedExpiration,
}

impl MemoryEntry {
    // == Constructor ==
    /// Creates an entry written at `now`.
    pub fn new(value: Vec<u8>, expiration: ResolvedExpiration, now: Instant) -> Self {
        Self {
            value,
            created_at: now,
            last_accessed: now,
            expiration,
        }
    }

    // == Size ==
    /// Size charged against the store's byte budget.
    pub fn size(&self) -> usize {
        self.value.len()
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once its absolute lifetime has fully elapsed, or
    /// once it has gone unread for its whole sliding window.
    pub fn is_expired(&self, now: Instant) -> bool {
        let absolute_elapsed = self
            .expiration
            .absolute
            .is_some_and(|ttl| now.duration_since(self.created_at) >= ttl);
        let sliding_elapsed = self
            .expiration
            .sliding
            .is_some_and(|window| now.duration_since(self.last_accessed) >= window);
        absolute_elapsed || sliding_elapsed
    }

    // == Touch ==
    /// Restarts the sliding window.
    pub fn touch(&mut self, now: Instant) {
        self.last_accessed = now;
    }
}
