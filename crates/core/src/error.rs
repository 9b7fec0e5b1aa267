//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid tier: {0}")]
    InvalidTier(String),

    #[error("no extractable content in {0}")]
    EmptyContent(String),

    #[error("embedding rows misaligned: {units} content units, {embeddings} embeddings")]
    MisalignedEmbeddings { units: usize, embeddings: usize },

    #[error("embedding has {got} components, expected {expected}")]
    BadEmbeddingWidth { got: usize, expected: usize },

    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
