//! Mutating operations on a [`GraphSnapshot`].
//!
//! Every operation validates all of its preconditions before touching the
//! snapshot. On error the snapshot is exactly as it was.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{Branch, Commit, DocumentMeta, Draft, Edge, GraphSnapshot, NewCommit};
use crate::error::GraphError;
use crate::model::{Block, BranchId, BranchName, CommitId, DocumentId};

/// Most parents a commit may have. A merge joins exactly two heads.
pub const MAX_PARENTS: usize = 2;

/// Outcome of [`GraphSnapshot::continue_from`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Continuation {
    /// The commit was its branch's leaf; keep editing there.
    Existing(BranchId),
    /// A new branch was forked from the commit.
    Forked(BranchId),
}

impl Continuation {
    #[must_use]
    pub const fn branch_id(&self) -> BranchId {
        match self {
            Self::Existing(id) | Self::Forked(id) => *id,
        }
    }
}

fn require_title(title: &str) -> Result<String, GraphError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(GraphError::Validation("commit title must not be blank".to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn require_blocks(blocks: &[Block]) -> Result<(), GraphError> {
    if blocks.is_empty() {
        return Err(GraphError::Validation(
            "a commit must contain at least one block".to_owned(),
        ));
    }
    Ok(())
}

impl GraphSnapshot {
    /// Create a document with a `main` branch holding one genesis commit.
    ///
    /// # Errors
    /// `GraphError::Validation` if `title` is blank or `blocks` is empty.
    pub fn genesis(
        document: DocumentId,
        title: &str,
        blocks: Vec<Block>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, GraphError> {
        let title = require_title(title)?;
        require_blocks(&blocks)?;
        let commit_id = CommitId::new(1);
        let main_id = BranchId::new(1);
        Ok(Self {
            document: DocumentMeta {
                id: document,
                title: title.clone(),
                created_at,
            },
            commits: vec![Commit {
                id: commit_id,
                branch_id: main_id,
                title,
                description: None,
                blocks,
                created_at,
            }],
            edges: Vec::new(),
            branches: vec![Branch {
                id: main_id,
                name: BranchName::main(),
                root_commit_id: commit_id,
                leaf_commit_id: commit_id,
                from_commit_id: None,
                draft_id: None,
                created_at,
            }],
            drafts: Vec::new(),
        })
    }

    /// Record a new commit on a branch and advance the branch's leaf.
    ///
    /// Parents default to the branch's current leaf. When given explicitly
    /// they must include that leaf; a second parent records a merge.
    /// The branch's draft is cleared.
    ///
    /// # Errors
    /// - `Validation` for an empty block list, a blank title, an unknown
    ///   branch or parent, duplicate parents, or more than two parents.
    /// - `Invariant` if the parents do not include the branch's leaf.
    pub fn create_commit(
        &mut self,
        request: NewCommit,
        created_at: DateTime<Utc>,
    ) -> Result<Commit, GraphError> {
        let NewCommit {
            branch_id,
            title,
            description,
            blocks,
            parents,
        } = request;
        let title = require_title(&title)?;
        require_blocks(&blocks)?;
        let branch = self.require_branch(branch_id)?;
        let leaf = branch.leaf_commit_id;
        let unborn = branch.is_unborn();
        let old_draft = branch.draft_id;

        let parents = if parents.is_empty() {
            vec![leaf]
        } else {
            parents
        };
        if parents.len() > MAX_PARENTS {
            return Err(GraphError::Validation(format!(
                "a commit may have at most {MAX_PARENTS} parents, got {}",
                parents.len()
            )));
        }
        let unique: BTreeSet<_> = parents.iter().collect();
        if unique.len() != parents.len() {
            return Err(GraphError::Validation("duplicate parent commit".to_owned()));
        }
        for parent in &parents {
            self.require_commit(*parent)?;
        }
        if !parents.contains(&leaf) {
            return Err(GraphError::Invariant(format!(
                "commits on branch '{}' must follow its head commit {leaf}",
                branch.name
            )));
        }

        let commit = Commit {
            id: self.next_commit_id()?,
            branch_id,
            title,
            description: description.filter(|d| !d.trim().is_empty()),
            blocks,
            created_at,
        };
        self.edges
            .extend(parents.iter().map(|&p| Edge::new(p, commit.id)));
        self.commits.push(commit.clone());
        let branch = self.branch_mut(branch_id)?;
        branch.leaf_commit_id = commit.id;
        if unborn {
            branch.root_commit_id = commit.id;
        }
        branch.draft_id = None;
        if let Some(draft) = old_draft {
            self.drafts.retain(|d| d.id != draft);
        }
        Ok(commit)
    }

    /// Fork a new branch at `from`.
    ///
    /// # Errors
    /// - `Validation` for a blank or overlong name or an unknown commit.
    /// - `Conflict` if the name is already used in this document.
    pub fn create_branch(
        &mut self,
        from: CommitId,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Branch, GraphError> {
        let name = BranchName::new(name)?;
        self.require_commit(from)?;
        if self.branch_by_name(name.as_str()).is_some() {
            return Err(GraphError::Conflict(format!(
                "a branch named '{name}' already exists"
            )));
        }
        let branch = Branch {
            id: self.next_branch_id()?,
            name,
            root_commit_id: from,
            leaf_commit_id: from,
            from_commit_id: Some(from),
            draft_id: None,
            created_at,
        };
        self.branches.push(branch.clone());
        Ok(branch)
    }

    /// Delete a branch together with its own commits and its draft.
    ///
    /// # Errors
    /// - `Validation` for an unknown branch.
    /// - `Invariant` for `main`, for the active branch, and for a branch whose
    ///   commits other history depends on (a fork point or a merge parent).
    pub fn delete_branch(
        &mut self,
        id: BranchId,
        active: Option<BranchId>,
    ) -> Result<(), GraphError> {
        let branch = self.require_branch(id)?;
        if branch.name.is_main() {
            return Err(GraphError::Invariant(
                "the 'main' branch cannot be deleted".to_owned(),
            ));
        }
        if active == Some(id) {
            return Err(GraphError::Invariant(format!(
                "branch '{}' is currently being edited",
                branch.name
            )));
        }
        let owned: BTreeSet<CommitId> = self
            .commits
            .iter()
            .filter(|c| c.branch_id == id)
            .map(|c| c.id)
            .collect();
        let depended_on = self
            .edges
            .iter()
            .any(|e| owned.contains(&e.from) && !owned.contains(&e.to))
            || self.branches.iter().any(|b| {
                b.id != id
                    && (b.from_commit_id.is_some_and(|f| owned.contains(&f))
                        || owned.contains(&b.leaf_commit_id))
            });
        if depended_on {
            return Err(GraphError::Invariant(format!(
                "other history depends on commits of branch '{}'",
                branch.name
            )));
        }

        self.commits.retain(|c| c.branch_id != id);
        self.edges.retain(|e| !owned.contains(&e.to));
        self.drafts.retain(|d| d.branch_id != id);
        self.branches.retain(|b| b.id != id);
        Ok(())
    }

    /// Delete the head commit of its branch and move the head back.
    ///
    /// The new head is the predecessor on the same branch, or the sole
    /// predecessor when there is none (the branch's fork point).
    ///
    /// # Errors
    /// - `Validation` for an unknown commit.
    /// - `Invariant` if the commit is not its branch's leaf, has successors,
    ///   is a fork point or another branch's head, or has no predecessor.
    pub fn delete_commit(&mut self, id: CommitId) -> Result<(), GraphError> {
        let commit = self.require_commit(id)?;
        let branch_id = commit.branch_id;
        let branch = self.branch(branch_id).ok_or_else(|| {
            GraphError::Integrity(format!(
                "commit {id} belongs to missing branch {branch_id}"
            ))
        })?;
        if branch.leaf_commit_id != id {
            return Err(GraphError::Invariant(format!(
                "commit {id} is not the head of branch '{}'",
                branch.name
            )));
        }
        if self.edges.iter().any(|e| e.from == id) {
            return Err(GraphError::Invariant(format!(
                "later commits follow commit {id}"
            )));
        }
        if let Some(other) = self.branches.iter().find(|b| {
            b.id != branch_id && (b.from_commit_id == Some(id) || b.leaf_commit_id == id)
        }) {
            return Err(GraphError::Invariant(format!(
                "branch '{}' starts at commit {id}",
                other.name
            )));
        }

        let predecessors = self.predecessors(id);
        let new_leaf = match predecessors.as_slice() {
            [] => {
                return Err(GraphError::Invariant(format!(
                    "commit {id} is the first commit of the document"
                )));
            }
            [only] => *only,
            many => {
                let on_branch: Vec<_> = many
                    .iter()
                    .filter(|p| self.commit(**p).is_some_and(|c| c.branch_id == branch_id))
                    .collect();
                match on_branch.as_slice() {
                    [one] => **one,
                    _ => {
                        return Err(GraphError::Invariant(format!(
                            "commit {id} has no unique predecessor on branch '{}'",
                            branch.name
                        )));
                    }
                }
            }
        };
        let was_root = branch.root_commit_id == id;

        self.commits.retain(|c| c.id != id);
        self.edges.retain(|e| e.to != id);
        let branch = self.branch_mut(branch_id)?;
        branch.leaf_commit_id = new_leaf;
        if was_root {
            branch.root_commit_id = new_leaf;
        }
        Ok(())
    }

    /// Replace the branch's draft in whole, creating it if absent.
    ///
    /// # Errors
    /// `Validation` for an unknown branch.
    pub fn save_draft(
        &mut self,
        branch_id: BranchId,
        blocks: Vec<Block>,
        saved_at: DateTime<Utc>,
    ) -> Result<Draft, GraphError> {
        let existing = self.require_branch(branch_id)?.draft_id;
        if let Some(draft) = existing.and_then(|id| self.drafts.iter_mut().find(|d| d.id == id)) {
            draft.blocks = blocks;
            draft.saved_at = saved_at;
            return Ok(draft.clone());
        }
        let draft = Draft {
            id: self.next_draft_id()?,
            branch_id,
            blocks,
            saved_at,
        };
        self.drafts.push(draft.clone());
        self.branch_mut(branch_id)?.draft_id = Some(draft.id);
        Ok(draft)
    }

    /// Drop the branch's draft. Returns it, if there was one.
    ///
    /// # Errors
    /// `Validation` for an unknown branch.
    pub fn discard_draft(&mut self, branch_id: BranchId) -> Result<Option<Draft>, GraphError> {
        let Some(draft_id) = self.branch_mut(branch_id)?.draft_id.take() else {
            return Ok(None);
        };
        let position = self.drafts.iter().position(|d| d.id == draft_id);
        Ok(position.map(|i| self.drafts.remove(i)))
    }

    /// Pick the branch on which editing from `commit` continues.
    ///
    /// # Errors
    /// Whatever [`GraphSnapshot::create_branch`] returns when a fork is needed.
    pub fn continue_from(
        &mut self,
        commit: CommitId,
        branch_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Continuation, GraphError> {
        let owner = self.require_commit(commit)?.branch_id;
        if self.branch(owner).is_some_and(|b| b.leaf_commit_id == commit) {
            return Ok(Continuation::Existing(owner));
        }
        let branch = self.create_branch(commit, branch_name, created_at)?;
        Ok(Continuation::Forked(branch.id))
    }

    /// Number of commits recorded on a branch.
    #[must_use]
    pub fn commit_count(&self, branch: BranchId) -> usize {
        self.commits.iter().filter(|c| c.branch_id == branch).count()
    }

    /// True when the branch's head is an ancestor of some other branch's head.
    ///
    /// An unborn branch is never merged.
    ///
    /// # Errors
    /// `Validation` for an unknown branch; `Integrity` from the traversal.
    pub fn is_merged(&self, branch: BranchId) -> Result<bool, GraphError> {
        let b = self.require_branch(branch)?;
        if b.is_unborn() {
            return Ok(false);
        }
        let leaf = b.leaf_commit_id;
        for other in self.branches.iter().filter(|o| o.id != branch) {
            if self.ancestors(other.leaf_commit_id)?.contains(&leaf) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::error::ErrorKind;

    fn main_id(g: &GraphSnapshot) -> BranchId {
        g.main_branch().unwrap().id
    }

    fn main_leaf(g: &GraphSnapshot) -> CommitId {
        g.main_branch().unwrap().leaf_commit_id
    }

    #[test]
    fn genesis_creates_main_with_root_commit() {
        let g = genesis();
        assert_eq!(g.commits.len(), 1);
        assert_eq!(g.branches.len(), 1);
        let main = g.main_branch().unwrap();
        assert_eq!(main.root_commit_id, main.leaf_commit_id);
        assert!(main.from_commit_id.is_none());
        assert!(g.edges.is_empty());
        g.validate().unwrap();
    }

    #[test]
    fn genesis_validates_input() {
        let err = GraphSnapshot::genesis(DocumentId::new(1), "  ", blocks(&["x"]), at(0));
        assert_eq!(err.unwrap_err().kind(), ErrorKind::Validation);
        let err = GraphSnapshot::genesis(DocumentId::new(1), "T", Vec::new(), at(0));
        assert_eq!(err.unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn commit_advances_leaf_and_records_edge() {
        let mut g = genesis();
        let c1 = main_leaf(&g);
        let c2 = g
            .create_commit(NewCommit::new(main_id(&g), "Second", blocks(&["a"])), at(1))
            .unwrap();
        assert_eq!(main_leaf(&g), c2.id);
        assert_eq!(g.main_branch().unwrap().root_commit_id, c1);
        assert_eq!(g.edges, vec![Edge::new(c1, c2.id)]);
        g.validate().unwrap();
    }

    #[test]
    fn commit_rejects_empty_blocks_and_blank_title() {
        let mut g = genesis();
        let before = g.clone();
        let main = main_id(&g);
        let err = g
            .create_commit(NewCommit::new(main, "T", Vec::new()), at(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = g
            .create_commit(NewCommit::new(main, " ", blocks(&["a"])), at(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(g, before);
    }

    #[test]
    fn commit_rejects_more_than_two_parents() {
        let (mut g, _, c1, c2) = forked();
        let other = g.create_branch(c1, "other", at(3)).unwrap().id;
        let c3 = g
            .create_commit(NewCommit::new(other, "C3", blocks(&["z"])), at(4))
            .unwrap()
            .id;
        let req = NewCommit::new(main_id(&g), "merge", blocks(&["m"])).with_parents(vec![c1, c2, c3]);
        let err = g.create_commit(req, at(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn commit_rejects_duplicate_and_unknown_parents() {
        let (mut g, _, c1, _) = forked();
        let main = main_id(&g);
        let req = NewCommit::new(main, "m", blocks(&["m"])).with_parents(vec![c1, c1]);
        assert_eq!(g.create_commit(req, at(5)).unwrap_err().kind(), ErrorKind::Validation);
        let req = NewCommit::new(main, "m", blocks(&["m"])).with_parents(vec![c1, CommitId::new(77)]);
        assert_eq!(g.create_commit(req, at(5)).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn commit_must_follow_branch_head() {
        let (mut g, _, _, c2) = forked();
        let req = NewCommit::new(main_id(&g), "m", blocks(&["m"])).with_parents(vec![c2]);
        assert_eq!(g.create_commit(req, at(5)).unwrap_err().kind(), ErrorKind::Invariant);
    }

    #[test]
    fn merge_commit_has_two_parents() {
        let (mut g, _, c1, c2) = forked();
        let req = NewCommit::new(main_id(&g), "Merge feature", blocks(&["hello", "world"]))
            .with_parents(vec![c1, c2]);
        let merge = g.create_commit(req, at(5)).unwrap();
        assert_eq!(g.predecessors(merge.id), vec![c1, c2]);
        assert_eq!(main_leaf(&g), merge.id);
        g.validate().unwrap();
    }

    #[test]
    fn first_commit_on_branch_becomes_its_root() {
        let (g, feature, c1, c2) = forked();
        let b = g.branch(feature).unwrap();
        assert_eq!(b.root_commit_id, c2);
        assert_eq!(b.leaf_commit_id, c2);
        assert_eq!(b.from_commit_id, Some(c1));
        assert!(g.edges.contains(&Edge::new(c1, c2)));
    }

    #[test]
    fn commit_clears_draft() {
        let mut g = genesis();
        let main = main_id(&g);
        g.save_draft(main, blocks(&["wip"]), at(1)).unwrap();
        assert!(g.draft_for(main).is_some());
        g.create_commit(NewCommit::new(main, "Done", blocks(&["wip"])), at(2))
            .unwrap();
        assert!(g.draft_for(main).is_none());
        assert!(g.drafts.is_empty());
    }

    #[test]
    fn create_branch_rejects_duplicates() {
        let (mut g, _, c1, _) = forked();
        let before = g.clone();
        let err = g.create_branch(c1, "feature", at(9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = g.create_branch(c1, "main", at(9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(g, before);
    }

    #[test]
    fn create_branch_rejects_blank_name_and_unknown_commit() {
        let mut g = genesis();
        let c1 = main_leaf(&g);
        assert_eq!(g.create_branch(c1, "  ", at(1)).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(
            g.create_branch(CommitId::new(50), "x", at(1)).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn delete_main_is_invariant() {
        let (mut g, ..) = forked();
        let before = g.clone();
        let err = g.delete_branch(main_id(&g), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert_eq!(g, before);
    }

    #[test]
    fn delete_active_branch_is_invariant() {
        let (mut g, feature, ..) = forked();
        let err = g.delete_branch(feature, Some(feature)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }

    #[test]
    fn delete_branch_removes_commits_edges_and_draft() {
        let (mut g, feature, _, c2) = forked();
        g.save_draft(feature, blocks(&["wip"]), at(3)).unwrap();
        g.delete_branch(feature, None).unwrap();
        assert!(g.branch(feature).is_none());
        assert!(g.commit(c2).is_none());
        assert!(g.edges.is_empty());
        assert!(g.drafts.is_empty());
        g.validate().unwrap();
    }

    #[test]
    fn delete_merged_branch_is_invariant() {
        let (mut g, feature, c1, c2) = forked();
        let req = NewCommit::new(main_id(&g), "merge", blocks(&["m"])).with_parents(vec![c1, c2]);
        g.create_commit(req, at(5)).unwrap();
        let err = g.delete_branch(feature, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }

    #[test]
    fn delete_branch_with_fork_is_invariant() {
        let (mut g, feature, _, c2) = forked();
        g.create_branch(c2, "sub", at(5)).unwrap();
        let err = g.delete_branch(feature, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }

    #[test]
    fn delete_unborn_branch() {
        let mut g = genesis();
        let c1 = main_leaf(&g);
        let idea = g.create_branch(c1, "idea", at(1)).unwrap().id;
        g.delete_branch(idea, Some(main_id(&g))).unwrap();
        assert_eq!(g.branches.len(), 1);
        assert_eq!(g.commits.len(), 1);
    }

    #[test]
    fn delete_non_leaf_commit_is_invariant_and_unchanged() {
        let mut g = genesis();
        let main = main_id(&g);
        let c1 = main_leaf(&g);
        g.create_commit(NewCommit::new(main, "two", blocks(&["2"])), at(1))
            .unwrap();
        let before = g.clone();
        let err = g.delete_commit(c1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert_eq!(g, before);
    }

    #[test]
    fn delete_leaf_moves_head_back() {
        let mut g = genesis();
        let main = main_id(&g);
        let c1 = main_leaf(&g);
        let c2 = g
            .create_commit(NewCommit::new(main, "two", blocks(&["2"])), at(1))
            .unwrap()
            .id;
        g.delete_commit(c2).unwrap();
        assert_eq!(main_leaf(&g), c1);
        assert!(g.edges.is_empty());
        g.validate().unwrap();
    }

    #[test]
    fn delete_genesis_is_invariant() {
        let mut g = genesis();
        let err = g.delete_commit(main_leaf(&g)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }

    #[test]
    fn delete_first_branch_commit_returns_to_fork_point() {
        let (mut g, feature, c1, c2) = forked();
        g.delete_commit(c2).unwrap();
        let b = g.branch(feature).unwrap();
        assert_eq!(b.leaf_commit_id, c1);
        assert_eq!(b.root_commit_id, c1);
        assert!(b.is_unborn());
        g.validate().unwrap();
    }

    #[test]
    fn delete_fork_point_is_invariant() {
        let mut g = genesis();
        let main = main_id(&g);
        let c2 = g
            .create_commit(NewCommit::new(main, "two", blocks(&["2"])), at(1))
            .unwrap()
            .id;
        g.create_branch(c2, "idea", at(2)).unwrap();
        let err = g.delete_commit(c2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
    }

    #[test]
    fn delete_merge_commit_returns_to_branch_parent() {
        let (mut g, _, c1, c2) = forked();
        let req = NewCommit::new(main_id(&g), "merge", blocks(&["m"])).with_parents(vec![c1, c2]);
        let merge = g.create_commit(req, at(5)).unwrap().id;
        g.delete_commit(merge).unwrap();
        assert_eq!(main_leaf(&g), c1);
        g.validate().unwrap();
    }

    #[test]
    fn save_draft_replaces_in_whole() {
        let mut g = genesis();
        let main = main_id(&g);
        let first = g.save_draft(main, blocks(&["a", "b"]), at(1)).unwrap();
        let second = g.save_draft(main, blocks(&["c"]), at(2)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(g.drafts.len(), 1);
        assert_eq!(g.draft_for(main).unwrap().blocks, blocks(&["c"]));
        assert_eq!(g.draft_for(main).unwrap().saved_at, at(2));
    }

    #[test]
    fn discard_draft_clears_reference() {
        let mut g = genesis();
        let main = main_id(&g);
        assert!(g.discard_draft(main).unwrap().is_none());
        g.save_draft(main, blocks(&["a"]), at(1)).unwrap();
        let dropped = g.discard_draft(main).unwrap();
        assert!(dropped.is_some());
        assert!(g.main_branch().unwrap().draft_id.is_none());
        assert!(g.drafts.is_empty());
    }

    #[test]
    fn continue_from_leaf_stays_on_branch() {
        let (mut g, feature, _, c2) = forked();
        let cont = g.continue_from(c2, "unused", at(5)).unwrap();
        assert_eq!(cont, Continuation::Existing(feature));
        assert_eq!(g.branches.len(), 2);
    }

    #[test]
    fn continue_from_history_forks() {
        let mut g = genesis();
        let main = main_id(&g);
        let c1 = main_leaf(&g);
        g.create_commit(NewCommit::new(main, "two", blocks(&["2"])), at(1))
            .unwrap();
        let cont = g.continue_from(c1, "rework", at(2)).unwrap();
        let Continuation::Forked(id) = cont else {
            panic!("expected a fork, got {cont:?}");
        };
        let b = g.branch(id).unwrap();
        assert_eq!(b.name.as_str(), "rework");
        assert_eq!(b.from_commit_id, Some(c1));
    }

    #[test]
    fn commit_counts_and_merged() {
        let (mut g, feature, c1, c2) = forked();
        let main = main_id(&g);
        assert_eq!(g.commit_count(main), 1);
        assert_eq!(g.commit_count(feature), 1);
        assert!(!g.is_merged(feature).unwrap());
        let req = NewCommit::new(main, "merge", blocks(&["m"])).with_parents(vec![c1, c2]);
        g.create_commit(req, at(5)).unwrap();
        assert!(g.is_merged(feature).unwrap());
        assert!(!g.is_merged(main).unwrap());
    }
}
