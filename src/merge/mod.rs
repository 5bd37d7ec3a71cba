//! Three-way merge session.
//!
//! A [`MergeSession`] joins the head of a *target* branch into the head of a
//! *base* branch. Starting a session diffs `base` against `target` once; every
//! non-unchanged entry is a conflict that needs a human decision. The working
//! buffer starts as a copy of `base` and from then on only changes through:
//!
//! - [`MergeSession::apply_block_from_side`] / [`MergeSession::apply_conflict_from_side`]
//! - [`MergeSession::apply_all_from_side`]
//! - [`MergeSession::replace_buffer`] (free-form edits from the editor)
//!
//! The diff is never recomputed and never rewrites the buffer on its own.
//! See [`phase`] for the lifecycle.

pub mod phase;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::{DiffEntry, DiffOptions, DiffSummary, diff_blocks};
use crate::error::GraphError;
use crate::graph::{Commit, GraphSnapshot, NewCommit};
use crate::model::{Block, BlockId, BranchId, BranchName, CommitId, DocumentId};
use crate::store::{GraphStore, StoreError};

pub use phase::MergePhase;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One of the two contributing sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The branch being merged into.
    Base,
    /// The branch being merged from.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Target => write!(f, "target"),
        }
    }
}

// ---------------------------------------------------------------------------
// MergeError
// ---------------------------------------------------------------------------

/// Errors from a merge session.
#[derive(Debug)]
pub enum MergeError {
    /// The session could not be set up from the snapshot.
    Graph(GraphError),
    /// The requested operation is not allowed in the current phase.
    InvalidTransition { from: MergePhase, to: MergePhase },
    /// No block with this id exists on the requested side.
    UnknownBlock { block: BlockId, side: Side },
    /// There are no conflicts to act on.
    NoConflictSelected,
    /// A merge commit needs at least one block.
    EmptyBuffer,
    /// The storage collaborator rejected the merge commit.
    Store(StoreError),
}

impl MergeError {
    /// True if the caller's snapshot must be refetched.
    #[must_use]
    pub fn requires_refetch(&self) -> bool {
        match self {
            Self::Graph(e) => e.requires_refetch(),
            Self::Store(e) => e.requires_refetch(),
            _ => false,
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "{e}"),
            Self::InvalidTransition { from, to } => write!(
                f,
                "merge session cannot go from '{from}' to '{to}'.\n  To fix: start a new merge session."
            ),
            Self::UnknownBlock { block, side } => write!(
                f,
                "block '{block}' does not exist on the {side} side.\n  To fix: pick a block id from the diff."
            ),
            Self::NoConflictSelected => write!(
                f,
                "there is no conflict to resolve.\n  To fix: resolve the merge or edit the buffer directly."
            ),
            Self::EmptyBuffer => write!(
                f,
                "the merged document is empty.\n  To fix: apply blocks from either side before resolving."
            ),
            Self::Store(e) => write!(f, "merge commit failed: {e}"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Graph(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GraphError> for MergeError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<StoreError> for MergeError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// MergeSource
// ---------------------------------------------------------------------------

/// A branch head taking part in a merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeSource {
    pub branch_id: BranchId,
    pub branch_name: BranchName,
    pub commit_id: CommitId,
    pub blocks: Vec<Block>,
}

impl MergeSource {
    /// The head of `branch` in `snapshot`.
    ///
    /// # Errors
    /// `Validation` for an unknown branch, `Integrity` if its head is missing.
    pub fn head_of(snapshot: &GraphSnapshot, branch: BranchId) -> Result<Self, GraphError> {
        let b = snapshot.require_branch(branch)?;
        let commit = snapshot.commit(b.leaf_commit_id).ok_or_else(|| {
            GraphError::Integrity(format!(
                "head {} of branch '{}' does not exist",
                b.leaf_commit_id, b.name
            ))
        })?;
        Ok(Self {
            branch_id: b.id,
            branch_name: b.name.clone(),
            commit_id: commit.id,
            blocks: commit.blocks.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// MergeSession
// ---------------------------------------------------------------------------

/// A three-way merge in progress.
#[derive(Clone, Debug)]
pub struct MergeSession {
    document: DocumentId,
    base: MergeSource,
    target: MergeSource,
    diff: Vec<DiffEntry>,
    /// Positions in `diff` of the conflicting entries.
    conflicts: Vec<usize>,
    cursor: Option<usize>,
    buffer: Vec<Block>,
    phase: MergePhase,
}

impl MergeSession {
    /// Start merging `target` into `base` using the heads in `snapshot`.
    ///
    /// # Errors
    /// `Validation` for unknown or identical branches; `Integrity` if a head
    /// commit is missing.
    pub fn start(
        snapshot: &GraphSnapshot,
        base: BranchId,
        target: BranchId,
        options: &DiffOptions,
    ) -> Result<Self, MergeError> {
        if base == target {
            return Err(GraphError::Validation("cannot merge a branch into itself".to_owned()).into());
        }
        let base = MergeSource::head_of(snapshot, base)?;
        let target = MergeSource::head_of(snapshot, target)?;
        Ok(Self::new(snapshot.document.id, base, target, options))
    }

    /// Start a session from explicit sources.
    #[must_use]
    pub fn new(
        document: DocumentId,
        base: MergeSource,
        target: MergeSource,
        options: &DiffOptions,
    ) -> Self {
        let diff = diff_blocks(&base.blocks, &target.blocks, options);
        let conflicts: Vec<usize> = diff
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_conflict())
            .map(|(i, _)| i)
            .collect();
        tracing::info!(
            document = %document,
            base = %base.branch_name,
            target = %target.branch_name,
            conflicts = conflicts.len(),
            "merge session started"
        );
        Self {
            document,
            cursor: (!conflicts.is_empty()).then_some(0),
            buffer: base.blocks.clone(),
            base,
            target,
            diff,
            conflicts,
            phase: MergePhase::Initialized,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> MergePhase {
        self.phase
    }

    #[must_use]
    pub const fn document(&self) -> DocumentId {
        self.document
    }

    #[must_use]
    pub const fn base(&self) -> &MergeSource {
        &self.base
    }

    #[must_use]
    pub const fn target(&self) -> &MergeSource {
        &self.target
    }

    /// The full structural diff of base against target.
    #[must_use]
    pub fn diff(&self) -> &[DiffEntry] {
        &self.diff
    }

    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        DiffSummary::of(&self.diff)
    }

    /// The conflicting entries, in diff order.
    pub fn conflicts(&self) -> impl Iterator<Item = &DiffEntry> {
        self.conflicts.iter().map(|&i| &self.diff[i])
    }

    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// Position of the selected conflict among [`MergeSession::conflicts`].
    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The selected conflict.
    #[must_use]
    pub fn current_conflict(&self) -> Option<&DiffEntry> {
        self.cursor.map(|c| &self.diff[self.conflicts[c]])
    }

    /// The working buffer.
    #[must_use]
    pub fn buffer(&self) -> &[Block] {
        &self.buffer
    }

    fn side(&self, side: Side) -> &MergeSource {
        match side {
            Side::Base => &self.base,
            Side::Target => &self.target,
        }
    }

    fn transition(&mut self, next: MergePhase) -> Result<(), MergeError> {
        if !self.phase.can_transition_to(next) {
            return Err(MergeError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!(from = %self.phase, to = %next, "merge phase");
        self.phase = next;
        Ok(())
    }

    /// Enter (or return to) `Reviewing` before any interaction.
    fn review(&mut self) -> Result<(), MergeError> {
        match self.phase {
            MergePhase::Reviewing => Ok(()),
            _ => self.transition(MergePhase::Reviewing),
        }
    }

    // -- navigation ---------------------------------------------------------

    /// Select the next conflict, wrapping from the last to the first.
    ///
    /// # Errors
    /// `InvalidTransition` once the session is finished.
    pub fn next_conflict(&mut self) -> Result<Option<&DiffEntry>, MergeError> {
        self.step(1)
    }

    /// Select the previous conflict, wrapping from the first to the last.
    ///
    /// # Errors
    /// `InvalidTransition` once the session is finished.
    pub fn previous_conflict(&mut self) -> Result<Option<&DiffEntry>, MergeError> {
        self.step(-1)
    }

    fn step(&mut self, delta: isize) -> Result<Option<&DiffEntry>, MergeError> {
        self.ensure_live()?;
        if self.phase == MergePhase::Initialized {
            self.transition(MergePhase::Reviewing)?;
        }
        let len = self.conflicts.len();
        if let Some(c) = self.cursor {
            let next = if delta < 0 {
                (c + len - 1) % len
            } else {
                (c + 1) % len
            };
            self.cursor = Some(next);
        }
        Ok(self.current_conflict())
    }

    /// Select a conflict by position.
    ///
    /// # Errors
    /// `NoConflictSelected` if `position` is out of range.
    pub fn select_conflict(&mut self, position: usize) -> Result<&DiffEntry, MergeError> {
        self.ensure_live()?;
        if position >= self.conflicts.len() {
            return Err(MergeError::NoConflictSelected);
        }
        if self.phase == MergePhase::Initialized {
            self.transition(MergePhase::Reviewing)?;
        }
        self.cursor = Some(position);
        Ok(&self.diff[self.conflicts[position]])
    }

    fn ensure_live(&self) -> Result<(), MergeError> {
        if self.phase.is_terminal() {
            return Err(MergeError::InvalidTransition {
                from: self.phase,
                to: MergePhase::Reviewing,
            });
        }
        Ok(())
    }

    // -- resolution ---------------------------------------------------------

    /// Copy the block with `id` from `side` into the buffer.
    ///
    /// A block already in the buffer under that id is replaced in place;
    /// otherwise the block is inserted at its source index, clamped to the
    /// buffer length. Applying the same block twice is the same as once.
    ///
    /// # Errors
    /// `UnknownBlock` if `side` has no block with `id`; `InvalidTransition`
    /// once the session is finished.
    pub fn apply_block_from_side(&mut self, id: &BlockId, side: Side) -> Result<(), MergeError> {
        let source = self.side(side);
        let (index, block) = source
            .blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.has_id(id))
            .map(|(i, b)| (i, b.clone()))
            .ok_or_else(|| MergeError::UnknownBlock {
                block: id.clone(),
                side,
            })?;
        self.review()?;
        self.place(index, block);
        Ok(())
    }

    fn place(&mut self, index: usize, block: Block) {
        let existing = block
            .id
            .as_ref()
            .and_then(|id| self.buffer.iter().position(|b| b.has_id(id)));
        match existing {
            Some(at) => self.buffer[at] = block,
            None => {
                let at = index.min(self.buffer.len());
                self.buffer.insert(at, block);
            }
        }
    }

    /// Replace the whole buffer with a copy of `side`. Earlier edits are lost.
    ///
    /// # Errors
    /// `InvalidTransition` once the session is finished.
    pub fn apply_all_from_side(&mut self, side: Side) -> Result<(), MergeError> {
        self.review()?;
        self.buffer = self.side(side).blocks.clone();
        Ok(())
    }

    /// Resolve the selected conflict by taking `side`'s version of it.
    ///
    /// The chosen block replaces the other side's block in the buffer, or is
    /// inserted at its source index when the other side has none. When
    /// `side` has no block for the entry (an addition taken from base, a
    /// deletion taken from target) the other side's block is removed.
    /// Anonymous blocks are found by content at the entry's position.
    /// Applying the same side twice is the same as once.
    ///
    /// # Errors
    /// `NoConflictSelected` when there are no conflicts.
    pub fn apply_conflict_from_side(&mut self, side: Side) -> Result<(), MergeError> {
        self.ensure_live()?;
        let entry = self
            .current_conflict()
            .ok_or(MergeError::NoConflictSelected)?
            .clone();
        let (chosen, other) = match side {
            Side::Base => (entry.old_block(), entry.new_block()),
            Side::Target => (entry.new_block(), entry.old_block()),
        };
        let hint = entry.index();
        let chosen_at = chosen.and_then(|b| self.locate_chosen(b, hint));
        let other_at = other.and_then(|b| self.locate_other(b, side, hint));
        let chosen = chosen.cloned();
        self.review()?;
        match (chosen, chosen_at, other_at) {
            (Some(block), Some(at), other_at) => {
                self.buffer[at] = block;
                if let Some(o) = other_at
                    && o != at
                {
                    self.buffer.remove(o);
                }
            }
            (Some(block), None, Some(o)) => self.buffer[o] = block,
            (Some(block), None, None) => {
                let index = block
                    .id
                    .as_ref()
                    .and_then(|id| self.side(side).blocks.iter().position(|b| b.has_id(id)))
                    .unwrap_or(hint);
                let at = index.min(self.buffer.len());
                self.buffer.insert(at, block);
            }
            (None, _, Some(o)) => {
                self.buffer.remove(o);
            }
            (None, _, None) => {}
        }
        Ok(())
    }

    /// Where the chosen block already sits in the buffer, if anywhere.
    fn locate_chosen(&self, block: &Block, hint: usize) -> Option<usize> {
        match &block.id {
            Some(id) => self.buffer.iter().position(|b| b.has_id(id)),
            None => self.anonymous_at(block, hint),
        }
    }

    /// Where the other side's version of an entry sits in the buffer.
    ///
    /// An id that also occurs on the chosen side belongs to that side and is
    /// never treated as the other version.
    fn locate_other(&self, block: &Block, chosen: Side, hint: usize) -> Option<usize> {
        match &block.id {
            Some(id) => {
                if self.side(chosen).blocks.iter().any(|b| b.has_id(id)) {
                    return None;
                }
                self.buffer.iter().position(|b| b.has_id(id))
            }
            None => self
                .anonymous_at(block, hint)
                .or_else(|| self.buffer.iter().position(|b| b == block)),
        }
    }

    fn anonymous_at(&self, block: &Block, hint: usize) -> Option<usize> {
        let clamped = hint.min(self.buffer.len().saturating_sub(1));
        [hint, clamped]
            .into_iter()
            .find(|&i| self.buffer.get(i) == Some(block))
    }

    /// Replace the buffer with free-form content from the editor.
    ///
    /// # Errors
    /// `InvalidTransition` once the session is finished.
    pub fn replace_buffer(&mut self, blocks: Vec<Block>) -> Result<(), MergeError> {
        self.review()?;
        self.buffer = blocks;
        Ok(())
    }

    /// Accept the buffer as the merge result.
    ///
    /// # Errors
    /// `EmptyBuffer` if the buffer has no blocks.
    pub fn resolve(&mut self) -> Result<(), MergeError> {
        self.ensure_live()?;
        if self.buffer.is_empty() {
            return Err(MergeError::EmptyBuffer);
        }
        if self.phase == MergePhase::Initialized {
            self.transition(MergePhase::Reviewing)?;
        }
        if self.phase == MergePhase::Reviewing {
            self.transition(MergePhase::Resolved)?;
        }
        Ok(())
    }

    /// Drop the session without committing.
    ///
    /// # Errors
    /// `InvalidTransition` if it is already finished.
    pub fn abandon(&mut self) -> Result<(), MergeError> {
        self.transition(MergePhase::Abandoned)
    }

    /// `Merge <target> into <base>`.
    #[must_use]
    pub fn default_title(&self) -> String {
        format!(
            "Merge {} into {}",
            self.target.branch_name, self.base.branch_name
        )
    }

    /// The commit request for the resolved buffer: recorded on the base
    /// branch, following both contributing heads.
    ///
    /// # Errors
    /// `InvalidTransition` unless the session is `Resolved`.
    pub fn merge_request(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<NewCommit, MergeError> {
        if self.phase != MergePhase::Resolved {
            return Err(MergeError::InvalidTransition {
                from: self.phase,
                to: MergePhase::Committed,
            });
        }
        let mut request = NewCommit::new(self.base.branch_id, title, self.buffer.clone())
            .with_parents(vec![self.base.commit_id, self.target.commit_id]);
        if let Some(d) = description {
            request = request.with_description(d);
        }
        Ok(request)
    }

    /// Submit the resolved buffer to the store as a merge commit.
    ///
    /// On success the session is `Committed`. On failure it returns to
    /// `Reviewing` with the buffer intact.
    ///
    /// # Errors
    /// `InvalidTransition` unless `Resolved`; `Store` if the store rejects it.
    #[tracing::instrument(skip_all, fields(document = %self.document, base = %self.base.commit_id, target = %self.target.commit_id))]
    pub async fn commit<S: GraphStore>(
        &mut self,
        store: &S,
        title: &str,
        description: Option<&str>,
    ) -> Result<Commit, MergeError> {
        let request = self.merge_request(title, description)?;
        match store.merge_commit(self.document, request).await {
            Ok(commit) => {
                self.transition(MergePhase::Committed)?;
                tracing::info!(commit = %commit.id, "merge committed");
                Ok(commit)
            }
            Err(e) => {
                tracing::warn!(error = %e, "merge commit rejected");
                self.transition(MergePhase::Reviewing)?;
                Err(MergeError::Store(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffKind;
    use crate::graph::fixtures::{at, forked};
    use crate::store::MemoryStore;

    fn p(id: &str, text: &str) -> Block {
        Block::paragraph(id, text)
    }

    fn anon(text: &str) -> Block {
        let mut data = serde_json::Map::new();
        data.insert("text".to_owned(), serde_json::Value::from(text));
        Block::anonymous(crate::model::BlockKind::Paragraph, data)
    }

    fn source(branch: u64, name: &str, commit: u64, blocks: Vec<Block>) -> MergeSource {
        MergeSource {
            branch_id: BranchId::new(branch),
            branch_name: BranchName::new(name).unwrap(),
            commit_id: CommitId::new(commit),
            blocks,
        }
    }

    fn session(base: Vec<Block>, target: Vec<Block>) -> MergeSession {
        MergeSession::new(
            DocumentId::new(1),
            source(1, "main", 1, base),
            source(2, "feature", 2, target),
            &DiffOptions::default(),
        )
    }

    #[test]
    fn buffer_starts_as_base() {
        let s = session(vec![p("a", "A")], vec![p("a", "B")]);
        assert_eq!(s.buffer(), &[p("a", "A")]);
        assert_eq!(s.phase(), MergePhase::Initialized);
        assert_eq!(s.conflict_count(), 1);
        assert_eq!(s.cursor(), Some(0));
    }

    #[test]
    fn no_conflicts_means_no_cursor() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "A")]);
        assert_eq!(s.conflict_count(), 0);
        assert!(s.next_conflict().unwrap().is_none());
        assert!(matches!(
            s.apply_conflict_from_side(Side::Target),
            Err(MergeError::NoConflictSelected)
        ));
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let base = vec![p("a", "1"), p("b", "2"), p("c", "3")];
        let target = vec![p("a", "1x"), p("b", "2"), p("c", "3x")];
        let mut s = session(base, target);
        assert_eq!(s.conflict_count(), 2);
        assert_eq!(s.next_conflict().unwrap().map(DiffEntry::index), Some(2));
        assert_eq!(s.phase(), MergePhase::Reviewing);
        assert_eq!(s.next_conflict().unwrap().map(DiffEntry::index), Some(0));
        assert_eq!(s.previous_conflict().unwrap().map(DiffEntry::index), Some(2));
        assert_eq!(s.select_conflict(0).unwrap().index(), 0);
        assert!(s.select_conflict(5).is_err());
    }

    #[test]
    fn apply_block_replaces_by_id() {
        let mut s = session(vec![p("a", "old"), p("b", "B")], vec![p("a", "new"), p("b", "B")]);
        s.apply_block_from_side(&BlockId::from("a"), Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "new"), p("b", "B")]);
    }

    #[test]
    fn apply_block_inserts_at_clamped_index() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "A"), p("x", "X"), p("y", "Y")]);
        s.apply_block_from_side(&BlockId::from("y"), Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A"), p("y", "Y")]);
        s.apply_block_from_side(&BlockId::from("x"), Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A"), p("x", "X"), p("y", "Y")]);
    }

    #[test]
    fn apply_block_is_idempotent() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "A"), p("x", "X")]);
        s.apply_block_from_side(&BlockId::from("x"), Side::Target).unwrap();
        let once = s.buffer().to_vec();
        s.apply_block_from_side(&BlockId::from("x"), Side::Target).unwrap();
        assert_eq!(s.buffer(), once.as_slice());
    }

    #[test]
    fn apply_unknown_block_fails_without_change() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "B")]);
        let err = s
            .apply_block_from_side(&BlockId::from("zz"), Side::Target)
            .unwrap_err();
        assert!(matches!(err, MergeError::UnknownBlock { .. }));
        assert_eq!(s.buffer(), &[p("a", "A")]);
        assert_eq!(s.phase(), MergePhase::Initialized);
    }

    #[test]
    fn apply_all_copies_side() {
        let base = vec![p("a", "A")];
        let target = vec![p("a", "B"), p("c", "C")];
        let mut s = session(base.clone(), target.clone());
        s.replace_buffer(vec![p("q", "free")]).unwrap();
        s.apply_all_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), target.as_slice());
        s.apply_all_from_side(Side::Base).unwrap();
        assert_eq!(s.buffer(), base.as_slice());
    }

    #[test]
    fn conflict_from_side_handles_additions_and_deletions() {
        let base = vec![p("a", "A"), p("d", "D")];
        let target = vec![p("a", "A")];
        let mut s = session(base, target);
        // Deleted entry: taking target removes the block.
        assert_eq!(s.current_conflict().map(DiffEntry::kind), Some(DiffKind::Deleted));
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A")]);
        // Taking base puts it back at its index.
        s.apply_conflict_from_side(Side::Base).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A"), p("d", "D")]);
    }

    #[test]
    fn conflict_from_side_replaces_modified_block() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "A2")]);
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A2")]);
        s.apply_conflict_from_side(Side::Base).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A")]);
    }

    #[test]
    fn conflict_from_side_swaps_blocks_with_different_ids() {
        let mut s = session(vec![p("a", "A")], vec![p("z", "Z")]);
        assert_eq!(s.current_conflict().map(DiffEntry::kind), Some(DiffKind::Modified));
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("z", "Z")]);
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("z", "Z")]);
        s.apply_conflict_from_side(Side::Base).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A")]);
    }

    #[test]
    fn conflict_from_side_keeps_position_among_neighbours() {
        let base = vec![p("a", "A"), p("b", "B"), p("c", "C")];
        let target = vec![p("a", "A"), p("y", "Y"), p("c", "C")];
        let mut s = session(base, target);
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A"), p("y", "Y"), p("c", "C")]);
    }

    #[test]
    fn conflict_from_side_ignores_id_owned_by_chosen_side() {
        // Target's second block reuses base's id; taking base keeps it.
        let base = vec![p("a", "A")];
        let target = vec![p("x", "X"), p("a", "A")];
        let mut s = session(base, target);
        s.select_conflict(1).unwrap();
        s.apply_conflict_from_side(Side::Base).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A")]);
    }

    #[test]
    fn anonymous_deletion_taken_from_target_removes_block() {
        let base = vec![p("a", "A"), anon("gone")];
        let target = vec![p("a", "A")];
        let mut s = session(base, target);
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A")]);
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A")]);
        s.apply_conflict_from_side(Side::Base).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A"), anon("gone")]);
    }

    #[test]
    fn anonymous_addition_is_not_duplicated() {
        let base = vec![p("a", "A")];
        let target = vec![p("a", "A"), anon("new")];
        let mut s = session(base, target);
        s.apply_conflict_from_side(Side::Target).unwrap();
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A"), anon("new")]);
        s.apply_conflict_from_side(Side::Base).unwrap();
        assert_eq!(s.buffer(), &[p("a", "A")]);
    }

    #[test]
    fn anonymous_modification_replaces_in_place() {
        let mut s = session(vec![anon("old"), p("b", "B")], vec![anon("new"), p("b", "B")]);
        s.apply_conflict_from_side(Side::Target).unwrap();
        assert_eq!(s.buffer(), &[anon("new"), p("b", "B")]);
        s.apply_conflict_from_side(Side::Base).unwrap();
        assert_eq!(s.buffer(), &[anon("old"), p("b", "B")]);
    }

    #[test]
    fn resolve_requires_blocks() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "B")]);
        s.replace_buffer(Vec::new()).unwrap();
        assert!(matches!(s.resolve(), Err(MergeError::EmptyBuffer)));
        s.apply_all_from_side(Side::Target).unwrap();
        s.resolve().unwrap();
        assert_eq!(s.phase(), MergePhase::Resolved);
    }

    #[test]
    fn editing_after_resolve_reopens_review() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "B")]);
        s.resolve().unwrap();
        s.apply_all_from_side(Side::Target).unwrap();
        assert_eq!(s.phase(), MergePhase::Reviewing);
    }

    #[test]
    fn merge_request_needs_resolution() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "B")]);
        assert!(matches!(
            s.merge_request("m", None),
            Err(MergeError::InvalidTransition { .. })
        ));
        s.resolve().unwrap();
        let req = s.merge_request("m", Some("why")).unwrap();
        assert_eq!(req.branch_id, BranchId::new(1));
        assert_eq!(req.parents, vec![CommitId::new(1), CommitId::new(2)]);
        assert_eq!(req.description.as_deref(), Some("why"));
    }

    #[test]
    fn abandoned_session_rejects_edits() {
        let mut s = session(vec![p("a", "A")], vec![p("a", "B")]);
        s.abandon().unwrap();
        assert!(s.apply_all_from_side(Side::Target).is_err());
        assert!(s.next_conflict().is_err());
        assert!(s.abandon().is_err());
    }

    #[test]
    fn default_title_names_both_branches() {
        let s = session(vec![p("a", "A")], vec![p("a", "B")]);
        assert_eq!(s.default_title(), "Merge feature into main");
    }

    #[test]
    fn start_rejects_self_merge() {
        let (g, feature, ..) = forked();
        let err = MergeSession::start(&g, feature, feature, &DiffOptions::default()).unwrap_err();
        assert!(matches!(err, MergeError::Graph(GraphError::Validation(_))));
    }

    #[tokio::test]
    async fn commit_records_two_parent_merge() {
        let (g, feature, c1, c2) = forked();
        let main = g.main_branch().unwrap().id;
        let store = MemoryStore::with_snapshot(g.clone());
        let mut s = MergeSession::start(&g, main, feature, &DiffOptions::default()).unwrap();
        s.apply_all_from_side(Side::Target).unwrap();
        s.resolve().unwrap();
        let commit = s.commit(&store, "Merge", None).await.unwrap();
        assert_eq!(s.phase(), MergePhase::Committed);
        assert_eq!(commit.blocks, s.target().blocks);
        let fresh = store.fetch(g.document.id).await.unwrap();
        assert_eq!(fresh.predecessors(commit.id), vec![c1, c2]);
        assert_eq!(fresh.main_branch().unwrap().leaf_commit_id, commit.id);
    }

    #[tokio::test]
    async fn failed_commit_returns_to_reviewing() {
        let (g, feature, ..) = forked();
        let main = g.main_branch().unwrap().id;
        let store = MemoryStore::with_snapshot(g.clone());
        let mut s = MergeSession::start(&g, main, feature, &DiffOptions::default()).unwrap();
        s.apply_all_from_side(Side::Target).unwrap();
        s.resolve().unwrap();
        // Move main on behind the session's back.
        let mut moved = g.clone();
        moved
            .create_commit(NewCommit::new(main, "later", vec![p("z", "Z")]), at(9))
            .unwrap();
        store.replace(moved).await;
        let err = s.commit(&store, "Merge", None).await.unwrap_err();
        assert!(matches!(err, MergeError::Store(_)));
        assert_eq!(s.phase(), MergePhase::Reviewing);
        assert_eq!(s.buffer(), s.target().blocks.as_slice());
    }
}
