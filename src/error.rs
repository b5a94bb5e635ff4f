//! Error types for the cache facade
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache operation.
///
/// A cache miss is not an error; it is reported as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A precondition on the caller's arguments failed (empty key, bad options)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Encoding produced no payload, or a stored payload could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store could not be reached
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The store was reached but rejected the operation
    #[error("Backend error: {0}")]
    Backend(String),

    /// The memory store cannot hold the payload
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// The compute function of a get-or-set call produced no value
    #[error("Compute failed: {0}")]
    ComputeFailed(String),

    /// The operation was aborted through its cancellation signal
    #[error("Operation cancelled")]
    Cancelled,

    /// Startup configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),
}

// == Error Kind ==
/// Field-less view of [`CacheError`] for callers that branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheErrorKind {
    InvalidArgument,
    Serialization,
    BackendUnavailable,
    Backend,
    CapacityExceeded,
    ComputeFailed,
    Cancelled,
    Configuration,
}

impl CacheError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> CacheErrorKind {
        match self {
            CacheError::InvalidArgument(_) => CacheErrorKind::InvalidArgument,
            CacheError::Serialization(_) => CacheErrorKind::Serialization,
            CacheError::BackendUnavailable(_) => CacheErrorKind::BackendUnavailable,
            CacheError::Backend(_) => CacheErrorKind::Backend,
            CacheError::CapacityExceeded(_) => CacheErrorKind::CapacityExceeded,
            CacheError::ComputeFailed(_) => CacheErrorKind::ComputeFailed,
            CacheError::Cancelled => CacheErrorKind::Cancelled,
            CacheError::Configuration(_) => CacheErrorKind::Configuration,
        }
    }

    /// True when the failure came from the store rather than the caller.
    ///
    /// Callers that want to degrade to "operate without cache" check this.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            CacheError::BackendUnavailable(_)
                | CacheError::Backend(_)
                | CacheError::CapacityExceeded(_)
        )
    }
}

// == Conversions ==
impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            CacheError::BackendUnavailable(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache facade.
pub type Result<T> = std::result::Result<T, CacheError>;
