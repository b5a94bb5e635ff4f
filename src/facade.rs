//! Cache Facade Module
//!
//! The typed API application code calls: set, get and get-or-set over any
//! [`CacheBackend`], with values encoded by the [`JsonCodec`].

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::backend::{BackendKind, CacheBackend};
use crate::cancel::CancelSignal;
use crate::codec::JsonCodec;
use crate::error::{CacheError, Result};
use crate::options::EntryOptions;

// == Cache ==
/// Typed cache handle.
///
/// Cloning is cheap: clones share the backend. The handle holds no mutable
/// state of its own, so it can be used from any number of tasks at once.
///
/// `get_or_set` does not coordinate concurrent callers: two tasks that miss
/// the same key at the same time both compute, and the last write wins.
#[derive(Debug, Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    codec: JsonCodec,
    cancel: CancelSignal,
}

impl Cache {
    // == Constructors ==
    /// Wraps `backend` with the default codec.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_codec(backend, JsonCodec::default())
    }

    /// Wraps `backend` with a specific codec.
    pub fn with_codec(backend: Arc<dyn CacheBackend>, codec: JsonCodec) -> Self {
        Self {
            backend,
            codec,
            cancel: CancelSignal::never(),
        }
    }

    /// Returns a handle on the same backend whose operations abort with
    /// [`CacheError::Cancelled`] once `signal` fires.
    pub fn with_cancellation(&self, signal: CancelSignal) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            codec: self.codec,
            cancel: signal,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn codec(&self) -> JsonCodec {
        self.codec
    }

    // == Set ==
    /// Encodes `value` and stores it at `key` with no expiration.
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_with_options(key, value, &EntryOptions::default())
            .await
    }

    /// Encodes `value` and stores it at `key`, replacing any existing entry.
    pub async fn set_with_options<T>(
        &self,
        key: &str,
        value: &T,
        options: &EntryOptions,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        validate_key(key)?;
        let bytes = self.codec.encode(value).map_err(|e| in_key(e, key))?;
        self.store(key, bytes, options).await
    }

    // == Get ==
    /// Reads and decodes the value at `key`; `Ok(None)` on a miss.
    ///
    /// A stored payload that does not decode as `T` is an error, never a miss.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        validate_key(key)?;
        match self.fetch(key).await? {
            Some(bytes) => {
                let value = self.codec.decode(&bytes).map_err(|e| in_key(e, key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    // == Get Or Set ==
    /// Returns the value at `key`, or computes, stores and returns it on a miss.
    ///
    /// `compute` runs at most once per call and only on a miss. A compute
    /// result of `None` fails with [`CacheError::ComputeFailed`] and nothing
    /// is stored.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        options: &EntryOptions,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        self.try_get_or_set(key, options, move || async move {
            Ok::<_, std::convert::Infallible>(compute().await)
        })
        .await
    }

    /// [`Cache::get_or_set`] with a synchronous compute function.
    pub async fn get_or_set_with<T, F>(
        &self,
        key: &str,
        options: &EntryOptions,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Option<T>,
    {
        self.get_or_set(key, options, move || std::future::ready(compute()))
            .await
    }

    /// [`Cache::get_or_set`] with a fallible compute function.
    ///
    /// A compute error becomes [`CacheError::ComputeFailed`]; nothing is stored.
    pub async fn try_get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        options: &EntryOptions,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        E: std::fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await? {
            return Ok(hit);
        }

        debug!("Computing value for missing key '{}'", key);
        let computed = self
            .cancel
            .guard(async {
                compute()
                    .await
                    .map_err(|e| CacheError::ComputeFailed(format!("key '{}': {}", key, e)))
            })
            .await?;

        let value = computed.ok_or_else(|| no_value(key))?;

        self.set_with_options(key, &value, options).await?;
        Ok(value)
    }

    // == Raw Bytes ==
    /// Stores `bytes` at `key` without encoding.
    pub async fn set_bytes(&self, key: &str, bytes: &[u8], options: &EntryOptions) -> Result<()> {
        validate_key(key)?;
        self.store(key, bytes.to_vec(), options).await
    }

    /// Reads the raw payload at `key`.
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        self.fetch(key).await
    }

    /// Get-or-set on raw payloads.
    pub async fn get_or_set_bytes<F>(
        &self,
        key: &str,
        options: &EntryOptions,
        compute: F,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce() -> Option<Vec<u8>>,
    {
        if let Some(hit) = self.get_bytes(key).await? {
            return Ok(hit);
        }
        let bytes = self.compute_on_miss(key, compute).await?;
        self.set_bytes(key, &bytes, options).await?;
        Ok(bytes)
    }

    // == Strings ==
    /// Stores `value` at `key` as plain UTF-8, without JSON quoting.
    pub async fn set_string(&self, key: &str, value: &str, options: &EntryOptions) -> Result<()> {
        self.set_bytes(key, value.as_bytes(), options).await
    }

    /// Reads a plain UTF-8 payload written by [`Cache::set_string`].
    pub async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get_bytes(key).await? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                CacheError::Serialization(format!("key '{}': payload is not UTF-8: {}", key, e))
            }),
            None => Ok(None),
        }
    }

    /// Get-or-set on plain UTF-8 payloads.
    pub async fn get_or_set_string<F>(
        &self,
        key: &str,
        options: &EntryOptions,
        compute: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Option<String>,
    {
        if let Some(hit) = self.get_string(key).await? {
            return Ok(hit);
        }
        let value = self.compute_on_miss(key, compute).await?;
        self.set_string(key, &value, options).await?;
        Ok(value)
    }

    // == Remove / Refresh ==
    /// Removes the entry at `key`. Removing a missing key succeeds.
    pub async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.cancel.guard(self.backend.remove(key)).await
    }

    /// Restarts the sliding expiration of `key` without reading it.
    pub async fn refresh(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.cancel.guard(self.backend.refresh(key)).await
    }

    /// Runs a synchronous compute under the cancel signal; a fired signal
    /// means `compute` is never called.
    async fn compute_on_miss<T, F>(&self, key: &str, compute: F) -> Result<T>
    where
        F: FnOnce() -> Option<T>,
    {
        debug!("Computing value for missing key '{}'", key);
        self.cancel
            .guard(async move { Ok(compute()) })
            .await?
            .ok_or_else(|| no_value(key))
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.cancel.guard(self.backend.get(key)).await
    }

    async fn store(&self, key: &str, bytes: Vec<u8>, options: &EntryOptions) -> Result<()> {
        self.cancel
            .guard(self.backend.set(key, bytes, options))
            .await
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidArgument(
            "cache key must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn no_value(key: &str) -> CacheError {
    CacheError::ComputeFailed(format!(
        "compute function for key '{}' returned no value",
        key
    ))
}

fn in_key(err: CacheError, key: &str) -> CacheError {
    match err {
        CacheError::Serialization(msg) => {
            CacheError::Serialization(format!("key '{}': {}", key, msg))
        }
        other => other,
    }
}
