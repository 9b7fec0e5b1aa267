//! Domain kinds and the deletion outcome.

use serde::{Deserialize, Serialize};

/// Kind of a domain. Every user owns exactly one `Default` domain, created
/// at provision time; it can be emptied but never deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    /// The protected default domain.
    Default,
    /// A user-created domain.
    UserCreated,
}

impl DomainKind {
    /// Decode from the stored integer form.
    pub fn from_i16(v: i16) -> crate::Result<Self> {
        match v {
            0 => Ok(Self::Default),
            1 => Ok(Self::UserCreated),
            other => Err(crate::Error::Validation(format!(
                "unknown domain kind: {other}"
            ))),
        }
    }

    /// The stored integer form.
    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Default => 0,
            Self::UserCreated => 1,
        }
    }

    /// Whether domains of this kind may be deleted.
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Default)
    }
}

/// Outcome of a domain deletion. Callers must branch on all three cases:
/// a protected default domain is left untouched, an unknown id deletes
/// nothing, and a successful deletion cascades to files and content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainDeletion {
    /// The target is the protected default domain; nothing was deleted.
    Protected,
    /// No such domain.
    NotFound,
    /// The domain, its files, and their content were removed.
    Deleted {
        /// Number of file records removed with the domain.
        files_removed: u64,
    },
}
