//! Deterministic 2-D placement of commits and drafts for the history view.
//!
//! - `x` is the branch's position in the snapshot's branch list times
//!   `branch_spacing`, plus `base_x_offset`. A commit sits in the lane of the
//!   branch it was recorded on.
//! - `y` follows [`LayoutStrategy`]. The default, [`LayoutStrategy::Depth`],
//!   is the commit's longest-path depth times `row_height`. It stays well
//!   formed with merge commits. [`LayoutStrategy::Time`] interpolates commit
//!   timestamps into `height_range`.
//! - A draft sits `draft_offset` directly below its branch's head commit.
//!
//! [`layout`] is a pure function of the snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::GraphError;
use crate::graph::GraphSnapshot;
use crate::model::{BranchId, BranchName, CommitId, DraftId, MAIN_BRANCH};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How the vertical coordinate is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutStrategy {
    /// Longest-path depth from the genesis commit.
    #[default]
    Depth,
    /// Commit timestamp scaled between the oldest and newest commit.
    Time,
}

/// Layout constants (`[layout]` in `docgraph.toml`).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    #[serde(default)]
    pub strategy: LayoutStrategy,
    #[serde(default = "default_branch_spacing")]
    pub branch_spacing: f64,
    #[serde(default = "default_base_x_offset")]
    pub base_x_offset: f64,
    #[serde(default = "default_base_y_offset")]
    pub base_y_offset: f64,
    /// Vertical span used by the time strategy.
    #[serde(default = "default_height_range")]
    pub height_range: f64,
    /// Distance between depth rows.
    #[serde(default = "default_row_height")]
    pub row_height: f64,
    /// Distance between a branch head and its draft.
    #[serde(default = "default_draft_offset")]
    pub draft_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            strategy: LayoutStrategy::default(),
            branch_spacing: default_branch_spacing(),
            base_x_offset: default_base_x_offset(),
            base_y_offset: default_base_y_offset(),
            height_range: default_height_range(),
            row_height: default_row_height(),
            draft_offset: default_draft_offset(),
        }
    }
}

const fn default_branch_spacing() -> f64 {
    250.0
}

const fn default_base_x_offset() -> f64 {
    150.0
}

const fn default_base_y_offset() -> f64 {
    100.0
}

const fn default_height_range() -> f64 {
    400.0
}

const fn default_row_height() -> f64 {
    120.0
}

const fn default_draft_offset() -> f64 {
    80.0
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A positioned node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    Commit(CommitId),
    Draft(DraftId),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit(id) => write!(f, "commit-{id}"),
            Self::Draft(id) => write!(f, "draft-{id}"),
        }
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// An edge between two placed commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LayoutEdge {
    pub from: CommitId,
    pub to: CommitId,
    /// The two commits were recorded on different branches (a fork or a
    /// merge).
    pub cross_branch: bool,
}

/// One branch column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Lane {
    pub branch_id: BranchId,
    pub name: BranchName,
    pub x: f64,
    pub color: &'static str,
}

/// The result of [`layout`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Layout {
    pub nodes: BTreeMap<NodeId, Point>,
    pub edges: Vec<LayoutEdge>,
    pub lanes: Vec<Lane>,
}

// ---------------------------------------------------------------------------
// Branch colours
// ---------------------------------------------------------------------------

/// Palette for non-`main` branches.
pub const BRANCH_PALETTE: [&str; 15] = [
    "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#06b6d4", "#84cc16", "#f97316", "#ec4899",
    "#14b8a6", "#a855f7", "#22c55e", "#3b82f6", "#f43f5e", "#eab308", "#6366f1",
];

/// Colour of `main`.
pub const MAIN_COLOR: &str = "#6366f1";

/// 31-multiplier rolling hash over UTF-16 code units, wrapped to 32 bits.
fn name_hash(name: &str) -> u64 {
    let hash = name.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    i64::from(hash).unsigned_abs()
}

/// Deterministic display colour for a branch name.
#[must_use]
pub fn branch_color(name: &str) -> &'static str {
    if name == MAIN_BRANCH {
        return MAIN_COLOR;
    }
    let len = BRANCH_PALETTE.len() as u64;
    let index = usize::try_from(name_hash(name) % len).unwrap_or(0);
    BRANCH_PALETTE[index]
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Place every commit and draft of `snapshot`.
///
/// # Errors
/// `Integrity` if a commit belongs to a missing branch, a branch head is
/// missing, or the edges do not form a DAG.
#[allow(clippy::cast_precision_loss)]
pub fn layout(snapshot: &GraphSnapshot, config: &LayoutConfig) -> Result<Layout, GraphError> {
    let lanes: Vec<Lane> = snapshot
        .branches
        .iter()
        .enumerate()
        .map(|(i, b)| Lane {
            branch_id: b.id,
            name: b.name.clone(),
            x: (i as f64).mul_add(config.branch_spacing, config.base_x_offset),
            color: branch_color(b.name.as_str()),
        })
        .collect();
    let lane_x: BTreeMap<BranchId, f64> = lanes.iter().map(|l| (l.branch_id, l.x)).collect();
    let y_of = vertical(snapshot, config)?;

    let mut nodes = BTreeMap::new();
    for commit in &snapshot.commits {
        let x = lane_x.get(&commit.branch_id).copied().ok_or_else(|| {
            GraphError::Integrity(format!(
                "commit {} belongs to missing branch {}",
                commit.id, commit.branch_id
            ))
        })?;
        let y = y_of.get(&commit.id).copied().unwrap_or(config.base_y_offset);
        nodes.insert(NodeId::Commit(commit.id), Point { x, y });
    }

    for branch in &snapshot.branches {
        let Some(draft) = snapshot.draft_for(branch.id) else {
            continue;
        };
        let head = nodes
            .get(&NodeId::Commit(branch.leaf_commit_id))
            .copied()
            .ok_or_else(|| {
                GraphError::Integrity(format!(
                    "head {} of branch '{}' does not exist",
                    branch.leaf_commit_id, branch.name
                ))
            })?;
        // The branch's own lane, even while its head is still the fork commit.
        let x = lane_x.get(&branch.id).copied().unwrap_or(head.x);
        nodes.insert(
            NodeId::Draft(draft.id),
            Point {
                x,
                y: head.y + config.draft_offset,
            },
        );
    }

    let branch_of: BTreeMap<CommitId, BranchId> =
        snapshot.commits.iter().map(|c| (c.id, c.branch_id)).collect();
    let edges = snapshot
        .edges
        .iter()
        .map(|e| LayoutEdge {
            from: e.from,
            to: e.to,
            cross_branch: branch_of.get(&e.from) != branch_of.get(&e.to),
        })
        .collect();

    Ok(Layout {
        nodes,
        edges,
        lanes,
    })
}

#[allow(clippy::cast_precision_loss)]
fn vertical(
    snapshot: &GraphSnapshot,
    config: &LayoutConfig,
) -> Result<BTreeMap<CommitId, f64>, GraphError> {
    match config.strategy {
        LayoutStrategy::Depth => Ok(snapshot
            .depths()?
            .into_iter()
            .map(|(id, depth)| {
                (
                    id,
                    (depth as f64).mul_add(config.row_height, config.base_y_offset),
                )
            })
            .collect()),
        LayoutStrategy::Time => {
            // Validate the DAG even though depth is not used.
            snapshot.depths()?;
            let millis = |c: &crate::graph::Commit| c.created_at.timestamp_millis();
            let min = snapshot.commits.iter().map(millis).min().unwrap_or(0);
            let max = snapshot.commits.iter().map(millis).max().unwrap_or(0);
            let span = match max - min {
                0 => 1.0,
                s => s as f64,
            };
            Ok(snapshot
                .commits
                .iter()
                .map(|c| {
                    let t = (millis(c) - min) as f64 / span;
                    (c.id, t.mul_add(config.height_range, config.base_y_offset))
                })
                .collect())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
