//! Quota admission types.
//!
//! An admission decision is data, not an error: a denied request means the
//! ledger worked and the ceiling was reached. Denials carry the observed
//! count and the ceiling so callers can render a precise message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which ceiling a quota check is enforcing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaKind {
    /// Total files per user, across all domains.
    Files,
    /// Domains per user.
    Domains,
    /// Questions per user over the trailing 24 hours.
    Questions,
}

impl QuotaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Domains => "domains",
            Self::Questions => "questions",
        }
    }
}

/// A quota denial: the ceiling was reached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDenied {
    pub kind: QuotaKind,
    /// The count observed at the moment of the attempted write.
    pub current: u64,
    /// The tier ceiling that was hit.
    pub limit: u64,
}

impl fmt::Display for QuotaDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            QuotaKind::Files => write!(
                f,
                "file limit reached: {} of {} files in use; remove files or upgrade to add more",
                self.current, self.limit
            ),
            QuotaKind::Domains => write!(
                f,
                "domain limit reached: {} of {} domains in use; delete a domain or upgrade to create more",
                self.current, self.limit
            ),
            QuotaKind::Questions => write!(
                f,
                "daily question limit reached: {} of {} questions in the last 24 hours; try again later or upgrade",
                self.current, self.limit
            ),
        }
    }
}

/// Outcome of a ledger admission check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Denied(QuotaDenied),
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// The denial, if any.
    pub fn denied(&self) -> Option<&QuotaDenied> {
        match self {
            Self::Granted => None,
            Self::Denied(d) => Some(d),
        }
    }
}
