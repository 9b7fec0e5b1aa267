//! Subscription tiers and their quota ceilings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription tier. Governs every quota ceiling in the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    /// Parse from the stored string form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            other => Err(crate::Error::InvalidTier(other.to_string())),
        }
    }

    /// The stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }

    /// Maximum total files a user of this tier may hold, across all domains.
    pub fn max_files(&self) -> u64 {
        match self {
            Self::Free => 10,
            Self::Premium => 100,
        }
    }

    /// Maximum domains a user of this tier may own.
    pub fn max_domains(&self) -> u64 {
        match self {
            Self::Free => 3,
            Self::Premium => 10,
        }
    }

    /// Question ceiling over the trailing 24 hours. `None` means unlimited.
    pub fn daily_question_limit(&self) -> Option<u64> {
        match self {
            Self::Free => Some(25),
            Self::Premium => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_roundtrip() {
        for tier in [Tier::Free, Tier::Premium] {
            assert_eq!(Tier::parse(tier.as_str()).unwrap(), tier);
        }
        assert!(Tier::parse("enterprise").is_err());
    }

    #[test]
    fn test_ceilings() {
        assert_eq!(Tier::Free.max_files(), 10);
        assert_eq!(Tier::Premium.max_files(), 100);
        assert_eq!(Tier::Free.max_domains(), 3);
        assert_eq!(Tier::Premium.max_domains(), 10);
        assert_eq!(Tier::Free.daily_question_limit(), Some(25));
        assert_eq!(Tier::Premium.daily_question_limit(), None);
    }
}
