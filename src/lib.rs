//! JSON Cache - A typed cache facade over memory and Redis backends
//!
//! Values are stored as JSON bytes through a [`JsonCodec`]. A [`Cache`]
//! offers set, get and get-or-set over whichever [`CacheBackend`] the
//! configured [`CacheStrategy`] selects.

pub mod backend;
pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod facade;
pub mod options;
pub mod strategy;
pub mod tasks;

pub use backend::{BackendKind, CacheBackend, MemoryBackend, RedisBackend};
pub use cancel::{CancelSignal, Canceller};
pub use codec::{FieldNaming, JsonCodec};
pub use config::CacheConfig;
pub use error::{CacheError, CacheErrorKind, Result};
pub use facade::Cache;
pub use options::EntryOptions;
pub use strategy::{build_backend, build_cache, CacheStrategy};
