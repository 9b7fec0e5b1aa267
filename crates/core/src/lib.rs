//! Core domain types and shared logic for Doclink.
//!
//! This crate defines the canonical data model used across all other crates:
//! - User, domain, file, and session identifiers
//! - Subscription tiers and their quota ceilings
//! - Content units, embeddings, and staged uploads
//! - Working sets (the cached per-user projection of a domain)
//! - Quota admission results and the domain-deletion outcome

pub mod config;
pub mod content;
pub mod domain;
pub mod embedding;
pub mod error;
pub mod id;
pub mod quota;
pub mod tier;
pub mod working_set;

pub use content::{ContentUnit, ExtractedDocument, StagedUpload};
pub use domain::{DomainDeletion, DomainKind};
pub use error::{Error, Result};
pub use id::{DomainId, FileId, SessionId, UserId};
pub use quota::{Admission, QuotaDenied, QuotaKind};
pub use tier::Tier;
pub use working_set::{WorkingSet, WorkingSetFile, WorkingSetUnit};

/// Embedding vector width. Every stored embedding must have exactly
/// this many components; mismatches are rejected at the boundary.
pub const EMBEDDING_DIM: usize = 384;

/// Maximum sentence length in bytes accepted into the store.
pub const MAX_SENTENCE_BYTES: usize = 8 * 1024;

/// Maximum number of files a single commit batch may carry.
pub const MAX_FILES_PER_COMMIT: usize = 32;
