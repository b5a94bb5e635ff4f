//! Entry Options Module
//!
//! Expiration policy attached to a stored value.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Entry Options ==
/// Expiration policy for a single cache entry.
///
/// All fields unset means the entry lives until it is removed or evicted.
/// When both absolute forms are set, the earlier deadline wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOptions {
    /// Absolute expiration as an instant in time
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Absolute expiration relative to the time the entry is written
    pub absolute_expiration_relative_to_now: Option<Duration>,
    /// Idle window: the entry expires if not read within this duration
    pub sliding_expiration: Option<Duration>,
}

/// Expiration policy resolved against a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedExpiration {
    /// Time until the hard deadline, if any
    pub absolute: Option<Duration>,
    /// Sliding window, if any
    pub sliding: Option<Duration>,
}

impl EntryOptions {
    /// Options with no expiration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the absolute expiration relative to now.
    pub fn with_absolute_expiration(mut self, ttl: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(ttl);
        self
    }

    /// Sets the absolute expiration instant.
    pub fn with_expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    /// Sets the sliding expiration window.
    pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
        self.sliding_expiration = Some(window);
        self
    }

    /// True when no expiration is configured.
    pub fn is_unbounded(&self) -> bool {
        self.absolute_expiration.is_none()
            && self.absolute_expiration_relative_to_now.is_none()
            && self.sliding_expiration.is_none()
    }

    // == Resolve ==
    /// Validates the options and resolves them against `now`.
    ///
    /// Zero durations and instants not after `now` are rejected.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<ResolvedExpiration> {
        if self.absolute_expiration_relative_to_now == Some(Duration::ZERO) {
            return Err(CacheError::InvalidArgument(
                "absolute expiration relative to now must be positive".to_string(),
            ));
        }
        if self.sliding_expiration == Some(Duration::ZERO) {
            return Err(CacheError::InvalidArgument(
                "sliding expiration must be positive".to_string(),
            ));
        }

        let at = match self.absolute_expiration {
            Some(at) => {
                let remaining = (at - now).to_std().ok().filter(|d| !d.is_zero());
                match remaining {
                    Some(remaining) => Some(remaining),
                    None => {
                        return Err(CacheError::InvalidArgument(format!(
                            "absolute expiration {} must be in the future",
                            at.to_rfc3339()
                        )))
                    }
                }
            }
            None => None,
        };

        let absolute = match (at, self.absolute_expiration_relative_to_now) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        Ok(ResolvedExpiration {
            absolute,
            sliding: self.sliding_expiration,
        })
    }
}

impl ResolvedExpiration {
    /// Lifetime granted by a write or a read at the start of a window.
    ///
    /// `elapsed` is the time since the entry was written.
    pub fn time_to_live(&self, elapsed: Duration) -> Option<Duration> {
        let hard = self.absolute.map(|abs| abs.saturating_sub(elapsed));
        match (hard, self.sliding) {
            (Some(hard), Some(sliding)) => Some(hard.min(sliding)),
            (hard, sliding) => hard.or(sliding),
        }
    }
}
