//! Sealer error types.

use thiserror::Error;

/// Sealing operation errors.
#[derive(Debug, Error)]
pub enum SealerError {
    #[error("key parsing error: {0}")]
    KeyParsing(String),

    #[error("seal failed: {0}")]
    Seal(String),

    #[error("open failed: ciphertext rejected (wrong key, corrupt data, or mismatched file id)")]
    Open,

    #[error("malformed envelope: {0}")]
    Envelope(String),
}

/// Result type for sealing operations.
pub type SealerResult<T> = std::result::Result<T, SealerError>;
