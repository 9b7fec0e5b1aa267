//! Content sealing for Doclink.
//!
//! This crate provides:
//! - Sealing key generation and encoding
//! - Authenticated encryption of content units at rest
//! - Binding of ciphertext to the owning file identifier
//!
//! Every sentence is sealed with the owning file's id as associated
//! data, so ciphertext copied from one file's rows to another fails
//! authentication on open instead of silently decrypting.

pub mod error;
pub mod key;
pub mod sealer;

pub use error::{SealerError, SealerResult};
pub use key::SealKey;
pub use sealer::ContentSealer;
