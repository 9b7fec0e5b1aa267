//! Sealing key type and encoding.

use crate::error::{SealerError, SealerResult};
use base64::Engine;
use chacha20poly1305::aead::OsRng;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit};
use std::fmt;

/// A 256-bit sealing key.
#[derive(Clone)]
pub struct SealKey {
    bytes: [u8; 32],
}

impl SealKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        Self { bytes: key.into() }
    }

    /// Parse from base64 (standard alphabet, 32 decoded bytes).
    pub fn from_base64(s: &str) -> SealerResult<Self> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(s.trim())
            .map_err(|e| SealerError::KeyParsing(format!("invalid base64: {e}")))?;

        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| SealerError::KeyParsing(format!("expected 32 bytes, got {}", v.len())))?;

        Ok(Self { bytes })
    }

    /// Encode as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.bytes)
    }

    /// Get the raw key bytes.
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl fmt::Debug for SealKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealKey([REDACTED])")
    }
}
