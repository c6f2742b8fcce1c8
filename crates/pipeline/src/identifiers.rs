//! Newtype domain identifiers.
//!
//! Every name the orchestrator hands to a version-control backend is wrapped in
//! a distinct newtype so an [`Owner`] cannot be passed where a
//! [`RepositorySlug`] is expected, even though both are strings on the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string identifier was given an empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} must not be empty")]
pub struct EmptyIdentifier {
    /// The identifier type that rejected the value.
    pub kind: &'static str,
}

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and
// String conversions that keep deserialisation from accepting "".
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(EmptyIdentifier {
                    kind: stringify!($name),
                })
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (platform-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: platform-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a pull request within one repository.
    ///
    /// Zero is representable because webhook payloads may carry it, but no
    /// platform ever assigns it; callers that need a real pull request must
    /// reject it.
    PullRequestId
}

impl PullRequestId {
    /// Returns `true` if this id is the unassigned value `0`.
    pub fn is_unassigned(self) -> bool {
        self.0 == 0
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (repository coordinates / Git names)
// ---------------------------------------------------------------------------

string_id! {
    /// The account or workspace that owns a repository (e.g. `"acme"`).
    Owner
}

string_id! {
    /// The URL-safe repository name within its owner (e.g. `"build-tools"`).
    RepositorySlug
}

string_id! {
    /// A Git reference as supplied by an event: a full commit hash, a short
    /// hash, or a branch name.
    ///
    /// Only after commit resolution is this guaranteed to be a full hash.
    GitReference
}

string_id! {
    /// A Git branch name (e.g. `"main"`, `"feature/status-comments"`).
    BranchName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_ids_reject_empty_values() {
        assert!(Owner::new("").is_none());
        assert!(GitReference::new(String::new()).is_none());
        assert_eq!(BranchName::new("main").unwrap().as_str(), "main");
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let slug = RepositorySlug::new("build-tools").unwrap();
        assert_eq!(serde_json::to_string(&slug).unwrap(), "\"build-tools\"");
    }

    #[test]
    fn string_ids_refuse_to_deserialize_empty_values() {
        let err = serde_json::from_str::<GitReference>("\"\"").unwrap_err();
        assert!(err.to_string().contains("GitReference must not be empty"));

        let branch: BranchName = serde_json::from_str("\"release/1.0\"").unwrap();
        assert_eq!(branch.as_str(), "release/1.0");
    }

    #[test]
    fn zero_pull_request_id_is_unassigned() {
        assert!(PullRequestId::new(0).is_unassigned());
        assert!(!PullRequestId::new(7).is_unassigned());
    }
}
