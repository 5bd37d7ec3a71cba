//! Error types for version-graph operations.
//!
//! Defines [`GraphError`], the error returned by every snapshot operation.
//! Each variant maps to one error kind callers are expected to handle
//! differently:
//!
//! - `Validation` and `Conflict` are user-correctable input problems.
//! - `Invariant` means the operation would break a graph invariant; the caller
//!   can pick a different operation.
//! - `Integrity` means the snapshot itself is inconsistent. It is fatal to
//!   the snapshot: the caller must discard it and refetch.

use std::fmt;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// The category of a [`GraphError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing required input.
    Validation,
    /// Name collision or concurrent-state mismatch.
    Conflict,
    /// The operation would violate a graph invariant.
    Invariant,
    /// The snapshot is internally inconsistent.
    Integrity,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Invariant => write!(f, "invariant"),
            Self::Integrity => write!(f, "integrity"),
        }
    }
}

// ---------------------------------------------------------------------------
// GraphError
// ---------------------------------------------------------------------------

/// Error returned by version-graph operations.
///
/// The payload is a human-readable description of what was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// Malformed or missing required input (e.g. a blank commit title).
    Validation(String),
    /// Name collision or state mismatch (e.g. a duplicate branch name).
    Conflict(String),
    /// The operation would violate a graph invariant (e.g. deleting `main`).
    Invariant(String),
    /// The snapshot is corrupted (e.g. a cycle or a dangling edge).
    Integrity(String),
}

impl GraphError {
    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Invariant(_) => ErrorKind::Invariant,
            Self::Integrity(_) => ErrorKind::Integrity,
        }
    }

    /// The description carried by this error.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::Conflict(m) | Self::Invariant(m) | Self::Integrity(m) => {
                m
            }
        }
    }

    /// True if the in-memory snapshot must be discarded and refetched.
    ///
    /// Only integrity errors poison the snapshot; every other kind leaves it
    /// untouched and usable.
    #[must_use]
    pub const fn requires_refetch(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(m) => write!(
                f,
                "invalid input: {m}.\n  To fix: correct the request and try again."
            ),
            Self::Conflict(m) => write!(
                f,
                "conflict: {m}.\n  To fix: choose a different name or refresh the document."
            ),
            Self::Invariant(m) => write!(
                f,
                "operation not allowed: {m}.\n  To fix: choose a different operation."
            ),
            Self::Integrity(m) => write!(
                f,
                "document history is inconsistent: {m}.\n  To fix: discard the current snapshot and reload the document."
            ),
        }
    }
}

impl std::error::Error for GraphError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
