//! Strategy Module
//!
//! Picks the backend named by configuration and assembles a ready [`Cache`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::backend::{CacheBackend, MemoryBackend, RedisBackend};
use crate::codec::JsonCodec;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::facade::Cache;

/// Backend strategy named by the `strategy` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStrategy {
    Memory,
    Distributed,
}

impl CacheStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::Memory => "memory",
            CacheStrategy::Distributed => "distributed",
        }
    }

    /// Reads the strategy out of `config`.
    ///
    /// A missing strategy is a configuration error; there is no fallback.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config
            .strategy
            .as_deref()
            .ok_or_else(|| CacheError::Configuration("no caching strategy configured".to_string()))?
            .parse()
    }
}

impl FromStr for CacheStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheStrategy::Memory),
            "distributed" => Ok(CacheStrategy::Distributed),
            other => Err(CacheError::Configuration(format!(
                "unknown caching strategy '{}', expected 'memory' or 'distributed'",
                other
            ))),
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Build Backend ==
/// Creates the backend selected by `config`.
///
/// The memory strategy also starts its background expiration scan unless the
/// scan interval is zero. The distributed strategy connects before returning.
pub async fn build_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
    match CacheStrategy::from_config(config)? {
        CacheStrategy::Memory => {
            let backend = MemoryBackend::from_settings(&config.memory);
            if config.memory.expiration_scan_interval_secs > 0 {
                backend.spawn_expiration_scan(config.memory.expiration_scan_interval());
            }
            info!(
                "Using memory cache (size_limit={:?}, max_entries={:?}, scan_interval={}s)",
                config.memory.size_limit,
                config.memory.max_entries,
                config.memory.expiration_scan_interval_secs
            );
            Ok(Arc::new(backend))
        }
        CacheStrategy::Distributed => {
            let backend = RedisBackend::connect(&config.distributed).await?;
            info!("Using distributed cache");
            Ok(Arc::new(backend))
        }
    }
}

// == Build Cache ==
/// Creates the backend selected by `config` and wraps it in a [`Cache`]
/// using the configured field naming.
pub async fn build_cache(config: &CacheConfig) -> Result<Cache> {
    let backend = build_backend(config).await?;
    Ok(Cache::with_codec(backend, JsonCodec::new(config.field_naming)))
}
