//! Error types for the refresh cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache facade and its storage engines.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Malformed call, rejected before the storage engine is touched
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Key absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Storage engine operation failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Refresh interval settings are inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A refresh callback failed for the given key
    #[error("Refresh failed for key '{key}': {source}")]
    Refresh {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CacheError {
    /// Returns true for the `NotFound` outcome, which callers treat as a miss
    /// rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
