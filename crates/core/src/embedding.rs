//! Embedding vector serialization and similarity helpers.
//!
//! Embeddings are stored as little-endian `f32` blobs, `4 × dimension`
//! bytes per row. Decoding validates the width so a truncated or
//! foreign-width blob is caught at the store boundary instead of
//! producing a skewed matrix.

/// Encode a float vector as a blob of little-endian `f32` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a blob back into a float vector of the expected dimension.
pub fn blob_to_vec(blob: &[u8], dimension: usize) -> crate::Result<Vec<f32>> {
    if blob.len() != dimension * 4 {
        return Err(crate::Error::BadEmbeddingWidth {
            got: blob.len() / 4,
            expected: dimension,
        });
    }
    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity between two vectors. Zero-magnitude vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
