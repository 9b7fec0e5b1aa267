//! Content store error types.

use thiserror::Error;

/// Content store operation errors.
///
/// Quota denials are NOT errors; they travel as
/// [`doclink_core::Admission`] values inside `Ok(..)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
