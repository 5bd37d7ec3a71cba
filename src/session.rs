//! Editing session over one document.
//!
//! A [`DocumentSession`] owns the current snapshot of a document, the branch
//! the user is editing and at most one [`MergeSession`]. Every mutation goes
//! through the [`GraphStore`]; the local snapshot is never patched in place.
//! After a successful mutation, and after any error that poisons the
//! snapshot, the session fetches a fresh one.

use crate::diff::DiffOptions;
use crate::error::GraphError;
use crate::graph::{Branch, Commit, Continuation, Draft, GraphSnapshot, NewCommit};
use crate::merge::{MergeError, MergeSession};
use crate::model::{Block, BranchId, CommitId, DocumentId};
use crate::store::{GraphStore, StoreError};

/// One user's view of one document.
#[derive(Debug)]
pub struct DocumentSession<S> {
    store: S,
    document: DocumentId,
    snapshot: GraphSnapshot,
    /// The last refetch failed; `snapshot` must not be trusted.
    stale: bool,
    active: BranchId,
    merge: Option<MergeSession>,
    diff_options: DiffOptions,
}

impl<S: GraphStore> DocumentSession<S> {
    /// Fetch `document` and start editing on `main`.
    ///
    /// # Errors
    /// Whatever the store returns, or `Integrity` if the fetched snapshot is
    /// inconsistent.
    #[tracing::instrument(skip(store, diff_options))]
    pub async fn open(
        store: S,
        document: DocumentId,
        diff_options: DiffOptions,
    ) -> Result<Self, StoreError> {
        let snapshot = fetch_valid(&store, document).await?;
        let active = snapshot.main_branch()?.id;
        Ok(Self {
            store,
            document,
            snapshot,
            stale: false,
            active,
            merge: None,
            diff_options,
        })
    }

    /// Create `document` in the store and open it.
    ///
    /// # Errors
    /// `Validation` for a blank title or no blocks, `Conflict` if the
    /// document already exists.
    pub async fn create(
        store: S,
        document: DocumentId,
        title: &str,
        blocks: Vec<Block>,
        diff_options: DiffOptions,
    ) -> Result<Self, StoreError> {
        store.create_document(document, title, blocks).await?;
        Self::open(store, document, diff_options).await
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn document(&self) -> DocumentId {
        self.document
    }

    /// The most recently fetched snapshot.
    pub const fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    /// True when the last refetch failed and the snapshot is outdated.
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    pub const fn active_branch_id(&self) -> BranchId {
        self.active
    }

    /// The branch being edited.
    ///
    /// # Errors
    /// `Integrity` if the active branch is missing from the snapshot.
    pub fn active_branch(&self) -> Result<&Branch, GraphError> {
        self.snapshot.branch(self.active).ok_or_else(|| {
            GraphError::Integrity(format!("active branch {} is missing", self.active))
        })
    }

    /// The merge in progress, if any.
    pub const fn merge(&self) -> Option<&MergeSession> {
        self.merge.as_ref()
    }

    pub const fn merge_mut(&mut self) -> Option<&mut MergeSession> {
        self.merge.as_mut()
    }

    // -----------------------------------------------------------------------
    // Snapshot refresh
    // -----------------------------------------------------------------------

    /// Discard the local snapshot and fetch the stored one.
    ///
    /// The active branch falls back to `main` if it no longer exists.
    ///
    /// # Errors
    /// Whatever the store returns, or `Integrity` for an inconsistent
    /// snapshot. The session is then marked stale.
    #[tracing::instrument(skip(self), fields(document = %self.document))]
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        match fetch_valid(&self.store, self.document).await {
            Ok(snapshot) => {
                if snapshot.branch(self.active).is_none() {
                    let main = snapshot.main_branch()?.id;
                    tracing::info!(from = %self.active, to = %main, "active branch gone, switching to main");
                    self.active = main;
                }
                self.snapshot = snapshot;
                self.stale = false;
                Ok(())
            }
            Err(e) => {
                self.stale = true;
                Err(e)
            }
        }
    }

    async fn ensure_fresh(&mut self) -> Result<(), StoreError> {
        if self.stale {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Refetch after a mutation. Errors that poison the snapshot also force a
    /// refetch; the original result is returned either way. A persisted
    /// mutation whose refetch fails leaves the session stale, and the next
    /// read through the session refetches first.
    async fn settle<T>(&mut self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        match result {
            Ok(value) => {
                if let Err(refetch) = self.refresh().await {
                    tracing::warn!(error = %refetch, "mutation persisted but refetch failed");
                }
                Ok(value)
            }
            Err(e) => {
                if e.requires_refetch()
                    && let Err(refetch) = self.refresh().await
                {
                    tracing::warn!(error = %refetch, "refetch after failed mutation also failed");
                }
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Switch editing to another branch.
    ///
    /// # Errors
    /// `Validation` for an unknown branch.
    pub async fn checkout(&mut self, branch: BranchId) -> Result<&Branch, StoreError> {
        self.ensure_fresh().await?;
        self.snapshot.require_branch(branch)?;
        self.active = branch;
        Ok(self.active_branch()?)
    }

    /// Commit `blocks` on the active branch after its head.
    ///
    /// # Errors
    /// `Validation` for a blank title or no blocks, plus store failures.
    #[tracing::instrument(skip(self, blocks, description), fields(document = %self.document, branch = %self.active))]
    pub async fn commit(
        &mut self,
        title: &str,
        description: Option<&str>,
        blocks: Vec<Block>,
    ) -> Result<Commit, StoreError> {
        let mut request = NewCommit::new(self.active, title, blocks);
        if let Some(d) = description {
            request = request.with_description(d);
        }
        let result = self.store.create_commit(self.document, request).await;
        self.settle(result).await
    }

    /// Save the working copy of the active branch.
    ///
    /// # Errors
    /// Store failures.
    #[tracing::instrument(skip(self, blocks), fields(document = %self.document, branch = %self.active))]
    pub async fn save_draft(&mut self, blocks: Vec<Block>) -> Result<Draft, StoreError> {
        let result = self
            .store
            .save_draft(self.document, self.active, blocks)
            .await;
        self.settle(result).await
    }

    /// Drop the active branch's draft.
    ///
    /// # Errors
    /// Store failures.
    pub async fn discard_draft(&mut self) -> Result<Option<Draft>, StoreError> {
        let result = self.store.discard_draft(self.document, self.active).await;
        self.settle(result).await
    }

    /// Fork a branch at `from`. The active branch does not change.
    ///
    /// # Errors
    /// `Validation` for a bad name or unknown commit, `Conflict` for a
    /// duplicate name.
    #[tracing::instrument(skip(self), fields(document = %self.document))]
    pub async fn create_branch(&mut self, from: CommitId, name: &str) -> Result<Branch, StoreError> {
        let result = self.store.create_branch(self.document, from, name).await;
        self.settle(result).await
    }

    /// Continue editing from `commit` and make the resulting branch active.
    ///
    /// A branch named `branch_name` is forked unless `commit` is the head of
    /// its own branch.
    ///
    /// # Errors
    /// `Validation` for an unknown commit or bad name, `Conflict` for a
    /// duplicate name.
    #[tracing::instrument(skip(self), fields(document = %self.document))]
    pub async fn continue_from(
        &mut self,
        commit: CommitId,
        branch_name: &str,
    ) -> Result<Continuation, StoreError> {
        let result = self
            .store
            .update(self.document, |g| {
                g.continue_from(commit, branch_name, chrono::Utc::now())
            })
            .await;
        let continuation = self.settle(result).await?;
        self.active = continuation.branch_id();
        Ok(continuation)
    }

    /// Delete a branch other than `main` and the active one.
    ///
    /// # Errors
    /// `Invariant` for `main`, the active branch, or a branch other history
    /// depends on.
    #[tracing::instrument(skip(self), fields(document = %self.document))]
    pub async fn delete_branch(&mut self, branch: BranchId) -> Result<(), StoreError> {
        let result = self
            .store
            .delete_branch(self.document, branch, Some(self.active))
            .await;
        self.settle(result).await
    }

    /// Delete a branch head commit.
    ///
    /// # Errors
    /// `Invariant` unless `commit` is the head of its branch and deletable.
    #[tracing::instrument(skip(self), fields(document = %self.document))]
    pub async fn delete_commit(&mut self, commit: CommitId) -> Result<(), StoreError> {
        let result = self.store.delete_commit(self.document, commit).await;
        self.settle(result).await
    }

    // -----------------------------------------------------------------------
    // Merging
    // -----------------------------------------------------------------------

    /// Start merging `target` into the active branch.
    ///
    /// # Errors
    /// `Conflict` if a merge is already in progress, `Validation` for an
    /// unknown branch or a self-merge.
    #[tracing::instrument(skip(self), fields(document = %self.document, base = %self.active))]
    pub async fn start_merge(&mut self, target: BranchId) -> Result<&mut MergeSession, MergeError> {
        if self.merge.as_ref().is_some_and(|m| !m.phase().is_terminal()) {
            return Err(GraphError::Conflict(
                "a merge is already in progress for this document".to_owned(),
            )
            .into());
        }
        self.ensure_fresh().await?;
        let session = MergeSession::start(&self.snapshot, self.active, target, &self.diff_options)?;
        Ok(self.merge.insert(session))
    }

    /// Record the resolved merge and end the merge session.
    ///
    /// On failure the merge session stays open in `Reviewing`.
    ///
    /// # Errors
    /// `Validation` without a merge in progress, `InvalidTransition` unless
    /// it is resolved, `Store` if the store rejects the commit.
    #[tracing::instrument(skip(self, description), fields(document = %self.document))]
    pub async fn commit_merge(
        &mut self,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Commit, MergeError> {
        let Some(merge) = self.merge.as_mut() else {
            return Err(GraphError::Validation("no merge in progress".to_owned()).into());
        };
        let title = title.map_or_else(|| merge.default_title(), str::to_owned);
        match merge.commit(&self.store, &title, description).await {
            Ok(commit) => {
                self.merge = None;
                if let Err(refetch) = self.refresh().await {
                    tracing::warn!(error = %refetch, "merge committed but refetch failed");
                }
                Ok(commit)
            }
            Err(e) => {
                if e.requires_refetch()
                    && let Err(refetch) = self.refresh().await
                {
                    tracing::warn!(error = %refetch, "refetch after failed merge also failed");
                }
                Err(e)
            }
        }
    }

    /// Drop the merge in progress.
    ///
    /// # Errors
    /// `Validation` without a merge in progress.
    pub fn abandon_merge(&mut self) -> Result<(), MergeError> {
        let Some(mut merge) = self.merge.take() else {
            return Err(GraphError::Validation("no merge in progress".to_owned()).into());
        };
        merge.abandon()?;
        tracing::info!(document = %self.document, "merge abandoned");
        Ok(())
    }
}

async fn fetch_valid<S: GraphStore>(
    store: &S,
    document: DocumentId,
) -> Result<GraphSnapshot, StoreError> {
    let snapshot = store.fetch(document).await?;
    snapshot.validate()?;
    Ok(snapshot)
}
