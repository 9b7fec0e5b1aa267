//! Identifier newtypes.
//!
//! All four identifiers wrap a UUID. Users and sessions arrive from the
//! outside (authentication layer, client-generated session ids); domain
//! and file ids are minted server-side at creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse from a string.
            pub fn parse(s: &str) -> crate::Result<Self> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    crate::Error::InvalidIdentifier(format!("invalid {}: {e}", $label))
                })
            }

            /// Get the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a user.
    UserId,
    "user ID"
);

uuid_id!(
    /// Unique identifier for a domain (a named group of files).
    DomainId,
    "domain ID"
);

uuid_id!(
    /// Unique identifier for an uploaded file.
    FileId,
    "file ID"
);

uuid_id!(
    /// Unique identifier for a question-counting session.
    SessionId,
    "session ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = FileId::new();
        let as_str = id.to_string();
        let parsed = FileId::parse(&as_str).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.as_uuid(), parsed.as_uuid());
        assert!(FileId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_ids_are_distinct_types() {
        let user = UserId::new();
        let serialized = serde_json::to_string(&user).unwrap();
        let back: UserId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(user, back);
    }
}
