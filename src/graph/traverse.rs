//! Traversal and integrity checks over the commit DAG.
//!
//! Every walk tracks visited commits and is bounded by the size of the
//! snapshot. A cycle is reported as [`GraphError::Integrity`], never looped on.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::GraphSnapshot;
use crate::error::GraphError;
use crate::model::CommitId;

impl GraphSnapshot {
    /// Direct predecessors of a commit, in edge order.
    #[must_use]
    pub fn predecessors(&self, id: CommitId) -> Vec<CommitId> {
        self.edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.from)
            .collect()
    }

    /// Direct successors of a commit, in edge order.
    #[must_use]
    pub fn successors(&self, id: CommitId) -> Vec<CommitId> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to)
            .collect()
    }

    /// Every commit `id` transitively follows. Does not include `id`.
    ///
    /// The walk is depth-first over predecessors. Reaching a commit that is
    /// still on the current path means the ancestry has a cycle, wherever it
    /// sits.
    ///
    /// # Errors
    /// - `Validation` if `id` is unknown.
    /// - `Integrity` for a cycle anywhere in the ancestry, or an edge from a
    ///   missing commit.
    pub fn ancestors(&self, id: CommitId) -> Result<BTreeSet<CommitId>, GraphError> {
        self.require_commit(id)?;
        let mut done = BTreeSet::new();
        let mut on_path = BTreeSet::from([id]);
        let mut stack = vec![(id, self.predecessors(id))];
        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            let Some(next) = pending.pop() else {
                on_path.remove(&node);
                done.insert(node);
                stack.pop();
                continue;
            };
            if on_path.contains(&next) {
                return Err(GraphError::Integrity(format!(
                    "commit history contains a cycle through commit {next}"
                )));
            }
            if done.contains(&next) {
                continue;
            }
            if self.commit(next).is_none() {
                return Err(dangling(next, node));
            }
            on_path.insert(next);
            stack.push((next, self.predecessors(next)));
        }
        done.remove(&id);
        Ok(done)
    }

    /// True if `ancestor` is a strict ancestor of `descendant`.
    ///
    /// # Errors
    /// See [`GraphSnapshot::ancestors`].
    pub fn is_ancestor(&self, ancestor: CommitId, descendant: CommitId) -> Result<bool, GraphError> {
        Ok(self.ancestors(descendant)?.contains(&ancestor))
    }

    /// Longest-path distance of every commit from a root (a commit with no
    /// predecessors). Roots have depth 0.
    ///
    /// # Errors
    /// `Integrity` if an edge names a missing commit or the edges form a cycle.
    pub fn depths(&self) -> Result<BTreeMap<CommitId, usize>, GraphError> {
        let mut in_degree: BTreeMap<CommitId, usize> =
            self.commits.iter().map(|c| (c.id, 0)).collect();
        for edge in &self.edges {
            if !in_degree.contains_key(&edge.from) {
                return Err(dangling(edge.from, edge.to));
            }
            match in_degree.get_mut(&edge.to) {
                Some(d) => *d += 1,
                None => return Err(dangling(edge.from, edge.to)),
            }
        }

        let mut depth: BTreeMap<CommitId, usize> = BTreeMap::new();
        let mut queue: VecDeque<CommitId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in &queue {
            depth.insert(*id, 0);
        }

        while let Some(id) = queue.pop_front() {
            let here = depth.get(&id).copied().unwrap_or(0);
            for next in self.successors(id) {
                let entry = depth.entry(next).or_insert(0);
                *entry = (*entry).max(here + 1);
                if let Some(d) = in_degree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if let Some((stuck, _)) = in_degree.iter().find(|(_, d)| **d > 0) {
            return Err(GraphError::Integrity(format!(
                "commit history contains a cycle through commit {stuck}"
            )));
        }
        Ok(depth)
    }

    /// Longest-path distance of one commit from a root.
    ///
    /// # Errors
    /// `Validation` for an unknown commit; otherwise see [`GraphSnapshot::depths`].
    pub fn depth(&self, id: CommitId) -> Result<usize, GraphError> {
        self.require_commit(id)?;
        self.depths()?
            .get(&id)
            .copied()
            .ok_or_else(|| GraphError::Integrity(format!("commit {id} has no depth")))
    }

    /// Check every structural invariant of the snapshot.
    ///
    /// # Errors
    /// `Integrity` describing the first violation found.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut ids = BTreeSet::new();
        for commit in &self.commits {
            if !ids.insert(commit.id) {
                return Err(GraphError::Integrity(format!(
                    "commit {} appears twice",
                    commit.id
                )));
            }
            if self.branch(commit.branch_id).is_none() {
                return Err(GraphError::Integrity(format!(
                    "commit {} belongs to missing branch {}",
                    commit.id, commit.branch_id
                )));
            }
        }

        let forkless: Vec<_> = self
            .branches
            .iter()
            .filter(|b| b.from_commit_id.is_none())
            .collect();
        match forkless.as_slice() {
            [main] if main.name.is_main() => {}
            [other] => {
                return Err(GraphError::Integrity(format!(
                    "branch '{}' has no fork point but is not 'main'",
                    other.name
                )));
            }
            [] => {
                return Err(GraphError::Integrity(
                    "document has no 'main' branch".to_owned(),
                ));
            }
            _ => {
                return Err(GraphError::Integrity(
                    "more than one branch has no fork point".to_owned(),
                ));
            }
        }
        let mut names = BTreeSet::new();
        for branch in &self.branches {
            if !names.insert(branch.name.as_str()) {
                return Err(GraphError::Integrity(format!(
                    "branch name '{}' is used twice",
                    branch.name
                )));
            }
        }

        // Acyclic and no dangling edges.
        self.depths()?;

        for branch in &self.branches {
            for (label, id) in [
                ("root", Some(branch.root_commit_id)),
                ("leaf", Some(branch.leaf_commit_id)),
                ("fork point", branch.from_commit_id),
            ] {
                if let Some(id) = id
                    && !ids.contains(&id)
                {
                    return Err(GraphError::Integrity(format!(
                        "branch '{}' {label} commit {id} does not exist",
                        branch.name
                    )));
                }
            }
            if branch.leaf_commit_id != branch.root_commit_id
                && !self.is_ancestor(branch.root_commit_id, branch.leaf_commit_id)?
            {
                return Err(GraphError::Integrity(format!(
                    "branch '{}' head {} is not reachable from its root {}",
                    branch.name, branch.leaf_commit_id, branch.root_commit_id
                )));
            }
            if let Some(draft_id) = branch.draft_id {
                match self.draft(draft_id) {
                    Some(d) if d.branch_id == branch.id => {}
                    _ => {
                        return Err(GraphError::Integrity(format!(
                            "branch '{}' references missing draft {draft_id}",
                            branch.name
                        )));
                    }
                }
            }
        }

        if let Some(orphan) = self
            .drafts
            .iter()
            .find(|d| self.branch(d.branch_id).and_then(|b| b.draft_id) != Some(d.id))
        {
            return Err(GraphError::Integrity(format!(
                "draft {} is not referenced by its branch",
                orphan.id
            )));
        }
        Ok(())
    }
}

fn dangling(from: CommitId, to: CommitId) -> GraphError {
    GraphError::Integrity(format!("edge {from} -> {to} references a missing commit"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
