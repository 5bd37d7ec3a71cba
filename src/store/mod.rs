//! Storage collaborator boundary.
//!
//! A [`GraphStore`] persists whole [`GraphSnapshot`]s keyed by document id.
//! Every request is one asynchronous round-trip. Implementations provide
//! [`GraphStore::fetch`], [`GraphStore::insert`] and [`GraphStore::update`];
//! the named operations are built on `update`, which applies a snapshot
//! operation to a copy, validates the result and persists it only if both
//! succeed.
//!
//! Callers never reuse a snapshot after a successful mutation: they fetch a
//! fresh one.

pub mod file;
pub mod memory;

use std::fmt;
use std::path::PathBuf;

use chrono::Utc;

use crate::error::GraphError;
use crate::graph::{Branch, Commit, Draft, GraphSnapshot, NewCommit};
use crate::model::{Block, BranchId, CommitId, DocumentId};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors returned by a [`GraphStore`].
#[derive(Debug)]
pub enum StoreError {
    /// The operation was rejected by the version graph.
    Graph(GraphError),
    /// No document with this id is stored.
    DocumentNotFound(DocumentId),
    /// Reading or writing persisted state failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A persisted document could not be decoded.
    Corrupt { path: PathBuf, detail: String },
}

impl StoreError {
    /// True if the caller's snapshot must be discarded and refetched.
    #[must_use]
    pub fn requires_refetch(&self) -> bool {
        match self {
            Self::Graph(e) => e.requires_refetch(),
            Self::Corrupt { .. } => true,
            Self::DocumentNotFound(_) | Self::Io { .. } => false,
        }
    }

    /// The graph error, if this is one.
    #[must_use]
    pub const fn as_graph(&self) -> Option<&GraphError> {
        match self {
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "{e}"),
            Self::DocumentNotFound(id) => write!(
                f,
                "document {id} not found.\n  To fix: create it first with `docgraph init`."
            ),
            Self::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            Self::Corrupt { path, detail } => write!(
                f,
                "stored document {} is corrupt: {detail}.\n  To fix: restore the file from a backup.",
                path.display()
            ),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Graph(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            Self::DocumentNotFound(_) | Self::Corrupt { .. } => None,
        }
    }
}

impl From<GraphError> for StoreError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

// ---------------------------------------------------------------------------
// GraphStore
// ---------------------------------------------------------------------------

/// Asynchronous persistence for document histories.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
    /// Fetch the full snapshot of a document.
    async fn fetch(&self, document: DocumentId) -> Result<GraphSnapshot, StoreError>;

    /// Persist a brand-new document. Fails with `Conflict` if it exists.
    async fn insert(&self, snapshot: GraphSnapshot) -> Result<(), StoreError>;

    /// Apply `op` to the stored snapshot atomically.
    ///
    /// Nothing is persisted unless `op` succeeds and the resulting snapshot
    /// passes [`GraphSnapshot::validate`].
    async fn update<T, F>(&self, document: DocumentId, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut GraphSnapshot) -> Result<T, GraphError>;

    /// Create a document with its `main` branch and genesis commit.
    async fn create_document(
        &self,
        document: DocumentId,
        title: &str,
        blocks: Vec<Block>,
    ) -> Result<GraphSnapshot, StoreError> {
        let snapshot = GraphSnapshot::genesis(document, title, blocks, Utc::now())?;
        self.insert(snapshot.clone()).await?;
        tracing::info!(document = %document, "document created");
        Ok(snapshot)
    }

    async fn create_commit(
        &self,
        document: DocumentId,
        request: NewCommit,
    ) -> Result<Commit, StoreError> {
        let commit = self
            .update(document, |g| g.create_commit(request, Utc::now()))
            .await?;
        tracing::info!(document = %document, commit = %commit.id, branch = %commit.branch_id, "commit created");
        Ok(commit)
    }

    async fn create_branch(
        &self,
        document: DocumentId,
        from: CommitId,
        name: &str,
    ) -> Result<Branch, StoreError> {
        let branch = self
            .update(document, |g| g.create_branch(from, name, Utc::now()))
            .await?;
        tracing::info!(document = %document, branch = %branch.id, name = %branch.name, from = %from, "branch created");
        Ok(branch)
    }

    async fn delete_branch(
        &self,
        document: DocumentId,
        branch: BranchId,
        active: Option<BranchId>,
    ) -> Result<(), StoreError> {
        self.update(document, |g| g.delete_branch(branch, active))
            .await?;
        tracing::info!(document = %document, branch = %branch, "branch deleted");
        Ok(())
    }

    async fn delete_commit(&self, document: DocumentId, commit: CommitId) -> Result<(), StoreError> {
        self.update(document, |g| g.delete_commit(commit)).await?;
        tracing::info!(document = %document, commit = %commit, "commit deleted");
        Ok(())
    }

    async fn save_draft(
        &self,
        document: DocumentId,
        branch: BranchId,
        blocks: Vec<Block>,
    ) -> Result<Draft, StoreError> {
        let draft = self
            .update(document, |g| g.save_draft(branch, blocks, Utc::now()))
            .await?;
        tracing::debug!(document = %document, branch = %branch, blocks = draft.blocks.len(), "draft saved");
        Ok(draft)
    }

    async fn discard_draft(
        &self,
        document: DocumentId,
        branch: BranchId,
    ) -> Result<Option<Draft>, StoreError> {
        self.update(document, |g| g.discard_draft(branch)).await
    }

    /// Record a merge commit. The request must name exactly two parents.
    async fn merge_commit(
        &self,
        document: DocumentId,
        request: NewCommit,
    ) -> Result<Commit, StoreError> {
        if request.parents.len() != 2 {
            return Err(GraphError::Validation(format!(
                "a merge commit needs exactly two parents, got {}",
                request.parents.len()
            ))
            .into());
        }
        self.create_commit(document, request).await
    }
}

/// Run `op` against a copy of `snapshot` and validate the outcome.
///
/// Shared by the store implementations.
pub(crate) fn apply<T, F>(snapshot: &GraphSnapshot, op: F) -> Result<(GraphSnapshot, T), GraphError>
where
    F: FnOnce(&mut GraphSnapshot) -> Result<T, GraphError>,
{
    let mut next = snapshot.clone();
    let value = op(&mut next)?;
    next.validate()?;
    Ok((next, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn refetch_only_for_integrity_and_corruption() {
        assert!(StoreError::Graph(GraphError::Integrity("x".into())).requires_refetch());
        assert!(
            StoreError::Corrupt {
                path: "a.json".into(),
                detail: "bad".into()
            }
            .requires_refetch()
        );
        assert!(!StoreError::Graph(GraphError::Invariant("x".into())).requires_refetch());
        assert!(!StoreError::DocumentNotFound(DocumentId::new(1)).requires_refetch());
    }

    #[test]
    fn display_mentions_path_and_hint() {
        let err = StoreError::Corrupt {
            path: "/tmp/7.json".into(),
            detail: "expected value".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/7.json"));
        assert!(msg.contains("To fix:"));
    }

    #[test]
    fn apply_leaves_original_untouched_on_error() {
        let g = crate::graph::fixtures::genesis();
        let main = g.main_branch().unwrap().id;
        let err = apply(&g, |s| s.delete_branch(main, None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert_eq!(g.branches.len(), 1);
    }

    #[test]
    fn apply_rejects_result_that_breaks_integrity() {
        let g = crate::graph::fixtures::genesis();
        let err = apply(&g, |s| {
            s.branches.clear();
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }
}
