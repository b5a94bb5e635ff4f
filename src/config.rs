//! Configuration Module
//!
//! Loads the caching section from environment variables.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::memory::DEFAULT_SCAN_INTERVAL_SECS;
use crate::backend::{DistributedSettings, MemorySettings};
use crate::codec::FieldNaming;
use crate::error::{CacheError, Result};

/// Section prefix read by [`CacheConfig::from_env`].
pub const DEFAULT_SECTION: &str = "CACHE";

/// Caching configuration section.
///
/// `strategy` is kept as written; the strategy selector rejects a missing or
/// unknown value when the cache is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `memory` or `distributed`
    pub strategy: Option<String>,
    /// Object key naming used by the codec
    pub field_naming: FieldNaming,
    /// Settings for the memory strategy
    pub memory: MemorySettings,
    /// Settings for the distributed strategy
    pub distributed: DistributedSettings,
}

impl CacheConfig {
    /// Loads the section named [`DEFAULT_SECTION`].
    pub fn from_env() -> Result<Self> {
        Self::from_section(DEFAULT_SECTION)
    }

    /// Loads the section whose variables start with `{section}_`.
    ///
    /// # Environment Variables
    /// - `{section}_STRATEGY` - `memory` or `distributed` (required to build a cache)
    /// - `{section}_FIELD_NAMING` - `preserve` or `camel_case` (default: preserve)
    /// - `{section}_SIZE_LIMIT` - Memory byte budget (default: unbounded)
    /// - `{section}_MAX_ENTRIES` - Memory entry budget (default: unbounded)
    /// - `{section}_SCAN_INTERVAL` - Seconds between expiration scans (default: 60, 0 disables)
    /// - `{section}_CONNECTION_STRING` - Redis URL for the distributed strategy
    /// - `{section}_INSTANCE_NAME` - Key prefix for the distributed strategy (default: empty)
    ///
    /// Unset variables take their defaults; a value that does not parse is a
    /// configuration error.
    pub fn from_section(section: &str) -> Result<Self> {
        let var = |name: &str| -> Option<String> {
            env::var(format!("{}_{}", section, name))
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let field_naming = match var("FIELD_NAMING") {
            Some(raw) => FieldNaming::parse(&raw).ok_or_else(|| {
                CacheError::Configuration(format!(
                    "{}_FIELD_NAMING: unknown naming policy '{}'",
                    section, raw
                ))
            })?,
            None => FieldNaming::default(),
        };

        Ok(Self {
            strategy: var("STRATEGY"),
            field_naming,
            memory: MemorySettings {
                size_limit: parse_opt(section, "SIZE_LIMIT", var("SIZE_LIMIT"))?,
                max_entries: parse_opt(section, "MAX_ENTRIES", var("MAX_ENTRIES"))?,
                expiration_scan_interval_secs: parse_opt(
                    section,
                    "SCAN_INTERVAL",
                    var("SCAN_INTERVAL"),
                )?
                .unwrap_or(DEFAULT_SCAN_INTERVAL_SECS),
            },
            distributed: DistributedSettings {
                connection_string: var("CONNECTION_STRING"),
                instance_name: var("INSTANCE_NAME").unwrap_or_default(),
            },
        })
    }

    /// A memory-strategy configuration with default settings.
    pub fn memory() -> Self {
        Self {
            strategy: Some("memory".to_string()),
            ..Self::default()
        }
    }

    /// A distributed-strategy configuration pointing at `connection_string`.
    pub fn distributed(connection_string: impl Into<String>) -> Self {
        Self {
            strategy: Some("distributed".to_string()),
            distributed: DistributedSettings {
                connection_string: Some(connection_string.into()),
                instance_name: String::new(),
            },
            ..Self::default()
        }
    }
}

fn parse_opt<T: FromStr>(section: &str, name: &str, raw: Option<String>) -> Result<Option<T>> {
    raw.map(|v| {
        v.parse().map_err(|_| {
            CacheError::Configuration(format!("{}_{}: cannot parse '{}'", section, name, v))
        })
    })
    .transpose()
}
