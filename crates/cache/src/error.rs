//! Cache error types.

use thiserror::Error;

/// Cache operation errors.
///
/// The in-process backend is effectively infallible, but the trait is
/// fallible so networked backends can surface transport failures as
/// retryable service errors rather than panics or silent misses.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
