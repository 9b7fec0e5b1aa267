//! Authenticated sealing of content units.

use crate::error::{SealerError, SealerResult};
use crate::key::SealKey;
use chacha20poly1305::aead::{Aead, AeadCore, OsRng, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use doclink_core::FileId;

/// Nonce length prepended to every sealed envelope.
const NONCE_LEN: usize = 12;

/// Seals and opens content units under a single key, binding each
/// envelope to the owning file's identifier.
#[derive(Clone)]
pub struct ContentSealer {
    cipher: ChaCha20Poly1305,
}

impl ContentSealer {
    /// Create a sealer from a key.
    pub fn new(key: &SealKey) -> Self {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Seal a sentence for the given file. The envelope is
    /// `nonce || ciphertext`, with the file id as associated data.
    pub fn seal(&self, plaintext: &str, file_id: FileId) -> SealerResult<Vec<u8>> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: file_id.as_uuid().as_bytes(),
                },
            )
            .map_err(|e| SealerError::Seal(e.to_string()))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(nonce.as_slice());
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    /// Open a sealed envelope for the given file. Fails if the envelope
    /// was sealed under a different key or for a different file id.
    pub fn open(&self, envelope: &[u8], file_id: FileId) -> SealerResult<String> {
        if envelope.len() < NONCE_LEN {
            return Err(SealerError::Envelope(format!(
                "envelope too short: {} bytes",
                envelope.len()
            )));
        }
        let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: file_id.as_uuid().as_bytes(),
                },
            )
            .map_err(|_| SealerError::Open)?;

        String::from_utf8(plaintext)
            .map_err(|e| SealerError::Envelope(format!("sealed payload is not UTF-8: {e}")))
    }
}
