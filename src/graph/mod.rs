//! Version graph: documents, commits, branches, drafts and the edges between
//! commits.
//!
//! A [`GraphSnapshot`] is the full in-memory picture of one document's
//! history as fetched from the storage collaborator. Entities live in flat
//! collections and refer to each other by id only. Mutating operations are in
//! [`ops`]; traversal and integrity checks are in [`traverse`].
//!
//! # Invariants
//!
//! - Exactly one branch, `main`, has no fork point. Its root is the genesis
//!   commit.
//! - The edge relation is acyclic.
//! - Every branch's leaf is reachable from its root.
//! - A commit's blocks never change once recorded.
//! - A branch references at most one draft; the draft references it back.

pub mod ops;
pub mod traverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::model::{Block, BranchId, BranchName, CommitId, DocumentId, DraftId};

pub use ops::Continuation;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Document-level metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: DocumentId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// An immutable snapshot of a block sequence recorded on a branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: CommitId,
    pub branch_id: BranchId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub blocks: Vec<Block>,
    pub created_at: DateTime<Utc>,
}

/// `to` was recorded as following `from`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: CommitId,
    pub to: CommitId,
}

impl Edge {
    #[must_use]
    pub const fn new(from: CommitId, to: CommitId) -> Self {
        Self { from, to }
    }
}

/// A named pointer into the history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: BranchName,
    /// First commit on this branch, or the fork point until there is one.
    pub root_commit_id: CommitId,
    /// Current head.
    pub leaf_commit_id: CommitId,
    /// Commit this branch forked from. `None` only for `main`.
    #[serde(default)]
    pub from_commit_id: Option<CommitId>,
    /// Uncommitted work in progress on this branch.
    #[serde(default)]
    pub draft_id: Option<DraftId>,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    /// True while the branch has no commits of its own.
    #[must_use]
    pub fn is_unborn(&self) -> bool {
        self.from_commit_id == Some(self.root_commit_id) && self.root_commit_id == self.leaf_commit_id
    }
}

/// Mutable uncommitted working state owned by a branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub branch_id: BranchId,
    pub blocks: Vec<Block>,
    pub saved_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// NewCommit
// ---------------------------------------------------------------------------

/// A request to record a commit.
///
/// An empty `parents` list means "follow the branch's current leaf".
#[derive(Clone, Debug, PartialEq)]
pub struct NewCommit {
    pub branch_id: BranchId,
    pub title: String,
    pub description: Option<String>,
    pub blocks: Vec<Block>,
    pub parents: Vec<CommitId>,
}

impl NewCommit {
    pub fn new(branch_id: BranchId, title: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            branch_id,
            title: title.into(),
            description: None,
            blocks,
            parents: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_parents(mut self, parents: Vec<CommitId>) -> Self {
        self.parents = parents;
        self
    }
}

// ---------------------------------------------------------------------------
// GraphSnapshot
// ---------------------------------------------------------------------------

/// The full history of one document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub document: DocumentMeta,
    pub commits: Vec<Commit>,
    pub edges: Vec<Edge>,
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub drafts: Vec<Draft>,
}

impl GraphSnapshot {
    #[must_use]
    pub fn commit(&self, id: CommitId) -> Option<&Commit> {
        self.commits.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    #[must_use]
    pub fn branch_by_name(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name.as_str() == name.trim())
    }

    #[must_use]
    pub fn draft(&self, id: DraftId) -> Option<&Draft> {
        self.drafts.iter().find(|d| d.id == id)
    }

    /// The draft currently referenced by `branch`, if any.
    #[must_use]
    pub fn draft_for(&self, branch: BranchId) -> Option<&Draft> {
        self.branch(branch)
            .and_then(|b| b.draft_id)
            .and_then(|id| self.draft(id))
    }

    /// Look up a commit or fail with a validation error.
    ///
    /// # Errors
    /// `GraphError::Validation` if the commit is not in this snapshot.
    pub fn require_commit(&self, id: CommitId) -> Result<&Commit, GraphError> {
        self.commit(id)
            .ok_or_else(|| GraphError::Validation(format!("commit {id} does not exist")))
    }

    /// Look up a branch or fail with a validation error.
    ///
    /// # Errors
    /// `GraphError::Validation` if the branch is not in this snapshot.
    pub fn require_branch(&self, id: BranchId) -> Result<&Branch, GraphError> {
        self.branch(id)
            .ok_or_else(|| GraphError::Validation(format!("branch {id} does not exist")))
    }

    /// The `main` branch.
    ///
    /// # Errors
    /// `GraphError::Integrity` if the snapshot has no `main` branch.
    pub fn main_branch(&self) -> Result<&Branch, GraphError> {
        self.branches
            .iter()
            .find(|b| b.name.is_main())
            .ok_or_else(|| GraphError::Integrity("document has no 'main' branch".to_owned()))
    }

    // Ids are allocated densely from the current maximum so that two
    // snapshots built by the same sequence of operations are identical.

    pub(crate) fn next_commit_id(&self) -> Result<CommitId, GraphError> {
        self.commits
            .iter()
            .map(|c| c.id)
            .max()
            .map_or(Ok(CommitId::new(1)), CommitId::next)
    }

    pub(crate) fn next_branch_id(&self) -> Result<BranchId, GraphError> {
        self.branches
            .iter()
            .map(|b| b.id)
            .max()
            .map_or(Ok(BranchId::new(1)), BranchId::next)
    }

    pub(crate) fn next_draft_id(&self) -> Result<DraftId, GraphError> {
        self.drafts
            .iter()
            .map(|d| d.id)
            .max()
            .map_or(Ok(DraftId::new(1)), DraftId::next)
    }

    pub(crate) fn branch_mut(&mut self, id: BranchId) -> Result<&mut Branch, GraphError> {
        self.branches
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| GraphError::Validation(format!("branch {id} does not exist")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn lookups_find_entities() {
        let (g, feature, c1, c2) = forked();
        assert_eq!(g.commit(c1).map(|c| c.title.as_str()), Some("Doc"));
        assert_eq!(g.commit(c2).map(|c| c.branch_id), Some(feature));
        assert_eq!(g.branch_by_name(" feature ").map(|b| b.id), Some(feature));
        assert!(g.branch_by_name("nope").is_none());
        assert!(g.main_branch().unwrap().name.is_main());
    }

    #[test]
    fn require_reports_validation() {
        let g = genesis();
        let err = g.require_commit(CommitId::new(99)).unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
        let err = g.require_branch(BranchId::new(99)).unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[test]
    fn missing_main_is_integrity() {
        let mut g = genesis();
        g.branches.clear();
        assert!(g.main_branch().unwrap_err().requires_refetch());
    }

    #[test]
    fn ids_are_allocated_after_max() {
        let (g, feature, _, c2) = forked();
        assert_eq!(g.next_commit_id().unwrap(), c2.next().unwrap());
        assert_eq!(g.next_branch_id().unwrap(), feature.next().unwrap());
        assert_eq!(g.next_draft_id().unwrap(), DraftId::new(1));
    }

    #[test]
    fn exhausted_id_space_is_integrity() {
        let mut g = genesis();
        let main = g.main_branch().unwrap().id;
        g.commits[0].id = CommitId::new(u64::MAX);
        g.branches[0].root_commit_id = CommitId::new(u64::MAX);
        g.branches[0].leaf_commit_id = CommitId::new(u64::MAX);
        let err = g
            .create_commit(NewCommit::new(main, "Next", blocks(&["x"])), at(1))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Integrity);
    }

    #[test]
    fn unborn_branch_until_first_commit() {
        let mut g = genesis();
        let c1 = g.main_branch().unwrap().leaf_commit_id;
        let b = g.create_branch(c1, "idea", at(1)).unwrap();
        assert!(b.is_unborn());
        assert!(!g.main_branch().unwrap().is_unborn());
    }

    #[test]
    fn snapshot_serde_round_trip() {
        let (g, ..) = forked();
        let json = serde_json::to_string(&g).unwrap();
        let back: GraphSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
    }
}
