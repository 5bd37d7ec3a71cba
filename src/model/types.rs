//! Identifier types for documents, commits, branches, drafts and blocks.
//!
//! Graph entities are identified by small integers allocated by the snapshot
//! that owns them. Blocks carry the string id assigned by the editing widget.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

// ---------------------------------------------------------------------------
// Numeric entity ids
// ---------------------------------------------------------------------------

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw id.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw numeric value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// The id following this one.
            ///
            /// # Errors
            /// `Integrity` if this is already the largest representable id.
            pub fn next(self) -> Result<Self, GraphError> {
                self.0.checked_add(1).map(Self).ok_or_else(|| {
                    GraphError::Integrity(format!(
                        concat!($label, " id {} is the largest possible; no id follows it"),
                        self.0
                    ))
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = GraphError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|_| {
                    GraphError::Validation(format!(
                        concat!("invalid ", $label, " id {:?}: expected a non-negative integer"),
                        s
                    ))
                })
            }
        }
    };
}

entity_id!(
    /// Identifies a document (one version graph).
    DocumentId,
    "document"
);
entity_id!(
    /// Identifies an immutable commit within a document.
    CommitId,
    "commit"
);
entity_id!(
    /// Identifies a branch within a document.
    BranchId,
    "branch"
);
entity_id!(
    /// Identifies a draft. Drafts have no identity once their branch is gone.
    DraftId,
    "draft"
);

// ---------------------------------------------------------------------------
// BlockId
// ---------------------------------------------------------------------------

/// Stable block identifier assigned by the editing widget.
///
/// Used only to correlate a block across two snapshots. Opaque otherwise.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Create a block id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// BranchName
// ---------------------------------------------------------------------------

/// Name of the branch every document starts with.
pub const MAIN_BRANCH: &str = "main";

/// A validated branch name: non-blank, trimmed, at most 100 characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// The maximum length of a branch name, in characters.
    pub const MAX_LEN: usize = 100;

    /// Validate and wrap a branch name. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// Returns `GraphError::Validation` if the name is blank or too long.
    pub fn new(name: &str) -> Result<Self, GraphError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(GraphError::Validation(
                "branch name must not be blank".to_owned(),
            ));
        }
        let len = trimmed.chars().count();
        if len > Self::MAX_LEN {
            return Err(GraphError::Validation(format!(
                "branch name must be at most {} characters, got {len}",
                Self::MAX_LEN
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The `main` branch name.
    #[must_use]
    pub fn main() -> Self {
        Self(MAIN_BRANCH.to_owned())
    }

    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this is the `main` branch name.
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.0 == MAIN_BRANCH
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BranchName {
    type Err = GraphError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BranchName {
    type Error = GraphError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_parses_and_displays() {
        let id: CommitId = "42".parse().unwrap();
        assert_eq!(id, CommitId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.next().unwrap(), CommitId::new(43));
    }

    #[test]
    fn entity_id_next_does_not_overflow() {
        let err = CommitId::new(u64::MAX).next().unwrap_err();
        assert!(err.requires_refetch(), "{err}");
    }

    #[test]
    fn entity_id_rejects_garbage() {
        let err = "abc".parse::<BranchId>().unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
        assert!(err.to_string().contains("branch"));
    }

    #[test]
    fn branch_name_trims_whitespace() {
        let name = BranchName::new("  feature  ").unwrap();
        assert_eq!(name.as_str(), "feature");
        assert!(!name.is_main());
    }

    #[test]
    fn branch_name_rejects_blank() {
        assert!(BranchName::new("   ").is_err());
        assert!(BranchName::new("").is_err());
    }

    #[test]
    fn branch_name_rejects_too_long() {
        let long = "x".repeat(BranchName::MAX_LEN + 1);
        assert!(BranchName::new(&long).is_err());
        assert!(BranchName::new(&"x".repeat(BranchName::MAX_LEN)).is_ok());
    }

    #[test]
    fn branch_name_serde_validates() {
        let ok: BranchName = serde_json::from_str("\"main\"").unwrap();
        assert!(ok.is_main());
        assert!(serde_json::from_str::<BranchName>("\"  \"").is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&CommitId::new(7)).unwrap();
        assert_eq!(json, "7");
        let block: BlockId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(block.as_str(), "abc");
    }
}
