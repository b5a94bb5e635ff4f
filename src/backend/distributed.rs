//! Distributed Backend Module
//!
//! Redis-backed byte store.
//!
//! Each entry is a Redis hash with three fields: `absexp` (absolute deadline,
//! unix milliseconds or -1), `sldexp` (sliding window in milliseconds or -1)
//! and `data` (the payload). The key's TTL is kept at the smaller of the
//! remaining absolute lifetime and the sliding window, and reads of sliding
//! entries push it forward.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BackendKind, CacheBackend};
use crate::error::{CacheError, Result};
use crate::options::EntryOptions;

const ABSOLUTE_FIELD: &str = "absexp";
const SLIDING_FIELD: &str = "sldexp";
const DATA_FIELD: &str = "data";
const NOT_PRESENT: i64 = -1;

// == Distributed Settings ==
/// Settings for the distributed strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributedSettings {
    /// Redis URL, e.g. `redis://127.0.0.1:6379/0`
    pub connection_string: Option<String>,
    /// Prefix prepended to every key, used to share one server between apps
    pub instance_name: String,
}

// == Redis Backend ==
/// Cache backend talking to a Redis server through a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    instance_name: String,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("instance_name", &self.instance_name)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    // == Connect ==
    /// Connects to the server named by `settings`.
    ///
    /// A missing or unparsable connection string is a configuration error;
    /// an unreachable server is `BackendUnavailable`.
    pub async fn connect(settings: &DistributedSettings) -> Result<Self> {
        let url = settings
            .connection_string
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                CacheError::Configuration(
                    "distributed strategy requires a connection string".to_string(),
                )
            })?;

        let client = redis::Client::open(url).map_err(|e| {
            CacheError::Configuration(format!("invalid Redis connection string: {}", e))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            warn!("Failed to connect to Redis: {}", e);
            CacheError::from(e)
        })?;

        info!(
            "Connected to Redis cache (instance name '{}')",
            settings.instance_name
        );

        Ok(Self {
            conn,
            instance_name: settings.instance_name.clone(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.instance_name, key)
    }

    // == Sliding Refresh ==
    /// Pushes the TTL of a sliding entry forward from now.
    async fn extend_sliding(
        &self,
        conn: &mut ConnectionManager,
        full_key: &str,
        absexp: Option<i64>,
        sldexp: Option<i64>,
    ) -> Result<()> {
        let Some(ttl_ms) = sliding_ttl_ms(absexp, sldexp, Utc::now().timestamp_millis()) else {
            return Ok(());
        };

        redis::cmd("PEXPIRE")
            .arg(full_key)
            .arg(ttl_ms)
            .query_async::<()>(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full_key = self.full_key(key);
        let mut conn = self.conn.clone();

        let (absexp, sldexp, data): (Option<i64>, Option<i64>, Option<Vec<u8>>) =
            redis::cmd("HMGET")
                .arg(&full_key)
                .arg(ABSOLUTE_FIELD)
                .arg(SLIDING_FIELD)
                .arg(DATA_FIELD)
                .query_async(&mut conn)
                .await?;

        let Some(data) = data else {
            debug!("Redis cache miss for key '{}'", full_key);
            return Ok(None);
        };

        self.extend_sliding(&mut conn, &full_key, absexp, sldexp).await?;
        debug!("Redis cache hit for key '{}' ({} bytes)", full_key, data.len());
        Ok(Some(data))
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<()> {
        let now = Utc::now();
        let fields = ExpiryFields::from_options(options, now.timestamp_millis())?;
        let full_key = self.full_key(key);
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("DEL")
            .arg(&full_key)
            .ignore()
            .cmd("HSET")
            .arg(&full_key)
            .arg(ABSOLUTE_FIELD)
            .arg(fields.absexp)
            .arg(SLIDING_FIELD)
            .arg(fields.sldexp)
            .arg(DATA_FIELD)
            .arg(value.as_slice())
            .ignore();
        if let Some(ttl_ms) = fields.ttl_ms {
            pipe.cmd("PEXPIRE").arg(&full_key).arg(ttl_ms).ignore();
        }
        pipe.query_async::<()>(&mut conn).await?;

        debug!(
            "Redis cache stored key '{}' ({} bytes, ttl {:?} ms)",
            full_key,
            value.len(),
            fields.ttl_ms
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let full_key = self.full_key(key);
        let mut conn = self.conn.clone();

        let deleted: i64 = redis::cmd("DEL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await?;

        debug!("Redis cache removed key '{}': {}", full_key, deleted > 0);
        Ok(())
    }

    async fn refresh(&self, key: &str) -> Result<()> {
        let full_key = self.full_key(key);
        let mut conn = self.conn.clone();

        let (absexp, sldexp): (Option<i64>, Option<i64>) = redis::cmd("HMGET")
            .arg(&full_key)
            .arg(ABSOLUTE_FIELD)
            .arg(SLIDING_FIELD)
            .query_async(&mut conn)
            .await?;

        self.extend_sliding(&mut conn, &full_key, absexp, sldexp).await
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Distributed
    }
}

// == Expiry Fields ==
/// Hash fields and initial TTL written alongside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExpiryFields {
    absexp: i64,
    sldexp: i64,
    ttl_ms: Option<u64>,
}

impl ExpiryFields {
    fn from_options(options: &EntryOptions, now_ms: i64) -> Result<Self> {
        let now = chrono::DateTime::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now);
        let resolved = options.resolve(now)?;

        let absexp = resolved
            .absolute
            .map_or(NOT_PRESENT, |ttl| now_ms.saturating_add(duration_ms(ttl)));
        let sldexp = resolved.sliding.map_or(NOT_PRESENT, duration_ms);
        let ttl_ms = resolved
            .time_to_live(Duration::ZERO)
            .map(|ttl| duration_ms(ttl).max(1) as u64);

        Ok(Self {
            absexp,
            sldexp,
            ttl_ms,
        })
    }
}

/// TTL to apply after a read, or None when the entry has no sliding window.
fn sliding_ttl_ms(absexp: Option<i64>, sldexp: Option<i64>, now_ms: i64) -> Option<i64> {
    let sliding = sldexp.filter(|&ms| ms > 0)?;
    let ttl = match absexp.filter(|&ms| ms > 0) {
        Some(deadline) => sliding.min(deadline - now_ms),
        None => sliding,
    };
    Some(ttl.max(1))
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
