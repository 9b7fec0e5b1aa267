//! Embedding engine boundary and the built-in feature-hash embedder.

use crate::error::EngineResult;
use sha2::{Digest, Sha256};

/// Produces fixed-width embedding vectors for sentences.
pub trait EmbeddingEngine: Send + Sync {
    /// Embed each sentence into a vector of `dimension()` components.
    fn embed(&self, sentences: &[String]) -> EngineResult<Vec<Vec<f32>>>;

    /// The vector width this engine produces.
    fn dimension(&self) -> usize;
}

/// Deterministic bag-of-words feature-hash embedder.
///
/// Each token is hashed into a bucket with a hash-derived sign, and the
/// vector is L2-normalized. No model weights, no I/O, stable across
/// runs — which is exactly what tests and development need. Retrieval
/// quality is out of scope here; production deployments substitute a
/// real model behind [`EmbeddingEngine`].
#[derive(Clone, Debug)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, sentence: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in sentence
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes(digest[..8].try_into().unwrap()) as usize % self.dimension;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let magnitude: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut vector {
                *v /= magnitude;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(doclink_core::EMBEDDING_DIM)
    }
}

impl EmbeddingEngine for HashEmbedder {
    fn embed(&self, sentences: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        Ok(sentences.iter().map(|s| self.embed_one(s)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
