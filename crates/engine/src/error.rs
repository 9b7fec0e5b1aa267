//! Engine error types.

use thiserror::Error;

/// Extraction and ranking errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no extractable content in {0}")]
    EmptyDocument(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
