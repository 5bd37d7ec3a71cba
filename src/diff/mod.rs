//! Block-level structural diff.
//!
//! [`structural_diff`] aligns two block sequences strictly by position: index
//! `i` of `old` is compared with index `i` of `new`. It is not move-aware.
//! Inserting one block at the front of a document shows up as every later
//! block being modified plus one trailing addition. That is the documented
//! contract of the default alignment.
//!
//! [`Alignment::IdAware`] is an opt-in alternative that first aligns blocks by
//! id (longest common subsequence of ids) and only falls back to positional
//! comparison inside the unmatched runs between aligned blocks.
//!
//! Two blocks at the same position are `Unchanged` when both their type tag
//! and their text projection agree. Modified entries carry a character-level
//! [`text_diff`] of the two projections for display.

pub mod text;

use serde::{Deserialize, Serialize};

use crate::model::{Block, project_to_text};

pub use text::{TextChunk, TextOp, text_diff};

// ---------------------------------------------------------------------------
// DiffEntry
// ---------------------------------------------------------------------------

/// The classification of a [`DiffEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Added,
    Deleted,
    Modified,
    Unchanged,
}

/// One aligned position in a structural diff.
///
/// `index` is the position of the entry in the input: the new-side index for
/// added, modified and unchanged entries, the old-side index for deleted ones.
/// With positional alignment both sides share the same index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffEntry {
    /// Present only in `new`.
    Added { index: usize, block: Block },
    /// Present only in `old`.
    Deleted { index: usize, block: Block },
    /// Present in both with a different type or projection.
    Modified {
        index: usize,
        old: Block,
        new: Block,
        text_diff: Vec<TextChunk>,
    },
    /// Present in both and equal.
    Unchanged { index: usize, block: Block },
}

impl DiffEntry {
    /// The classification of this entry.
    #[must_use]
    pub const fn kind(&self) -> DiffKind {
        match self {
            Self::Added { .. } => DiffKind::Added,
            Self::Deleted { .. } => DiffKind::Deleted,
            Self::Modified { .. } => DiffKind::Modified,
            Self::Unchanged { .. } => DiffKind::Unchanged,
        }
    }

    /// The input position recorded for this entry.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Added { index, .. }
            | Self::Deleted { index, .. }
            | Self::Modified { index, .. }
            | Self::Unchanged { index, .. } => *index,
        }
    }

    /// True for every entry a merge has to surface for a decision.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }

    /// The block on the old side, if any.
    #[must_use]
    pub const fn old_block(&self) -> Option<&Block> {
        match self {
            Self::Deleted { block, .. } | Self::Unchanged { block, .. } => Some(block),
            Self::Modified { old, .. } => Some(old),
            Self::Added { .. } => None,
        }
    }

    /// The block on the new side, if any.
    #[must_use]
    pub const fn new_block(&self) -> Option<&Block> {
        match self {
            Self::Added { block, .. } | Self::Unchanged { block, .. } => Some(block),
            Self::Modified { new, .. } => Some(new),
            Self::Deleted { .. } => None,
        }
    }
}

fn compare(index: usize, old: &Block, new: &Block) -> DiffEntry {
    let old_text = project_to_text(old);
    let new_text = project_to_text(new);
    if old.kind == new.kind && old_text == new_text {
        DiffEntry::Unchanged {
            index,
            block: old.clone(),
        }
    } else {
        DiffEntry::Modified {
            index,
            old: old.clone(),
            new: new.clone(),
            text_diff: text_diff(&old_text, &new_text),
        }
    }
}

// ---------------------------------------------------------------------------
// Positional diff
// ---------------------------------------------------------------------------

/// Diff two block sequences by position.
///
/// Always yields exactly `max(old.len(), new.len())` entries, in index order.
#[must_use]
pub fn structural_diff(old: &[Block], new: &[Block]) -> Vec<DiffEntry> {
    let len = old.len().max(new.len());
    (0..len)
        .filter_map(|index| match (old.get(index), new.get(index)) {
            (Some(o), Some(n)) => Some(compare(index, o, n)),
            (None, Some(n)) => Some(DiffEntry::Added {
                index,
                block: n.clone(),
            }),
            (Some(o), None) => Some(DiffEntry::Deleted {
                index,
                block: o.clone(),
            }),
            (None, None) => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Alignment options
// ---------------------------------------------------------------------------

/// How blocks of the two sequences are paired up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    /// Index `i` against index `i`.
    #[default]
    Positional,
    /// Longest common subsequence of block ids, positional inside gaps.
    IdAware,
}

/// Options for [`diff_blocks`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffOptions {
    pub alignment: Alignment,
}

/// Diff two block sequences using the configured alignment.
#[must_use]
pub fn diff_blocks(old: &[Block], new: &[Block], options: &DiffOptions) -> Vec<DiffEntry> {
    let entries = match options.alignment {
        Alignment::Positional => structural_diff(old, new),
        Alignment::IdAware => id_aware_diff(old, new),
    };
    tracing::debug!(
        old = old.len(),
        new = new.len(),
        entries = entries.len(),
        alignment = ?options.alignment,
        "computed structural diff"
    );
    entries
}

fn ids_match(a: &Block, b: &Block) -> bool {
    matches!((&a.id, &b.id), (Some(x), Some(y)) if x == y)
}

/// Pairs `(old_index, new_index)` of blocks aligned by id.
fn align_ids(old: &[Block], new: &[Block]) -> Vec<(usize, usize)> {
    let (n, m) = (old.len(), new.len());
    // lcs[i][j] = LCS length of old[i..] and new[j..].
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if ids_match(&old[i], &new[j]) {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }
    let mut pairs = Vec::with_capacity(lcs[0][0]);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if ids_match(&old[i], &new[j]) {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

fn id_aware_diff(old: &[Block], new: &[Block]) -> Vec<DiffEntry> {
    let mut entries = Vec::with_capacity(old.len().max(new.len()));
    let (mut i, mut j) = (0, 0);
    let anchors = align_ids(old, new)
        .into_iter()
        .chain(std::iter::once((old.len(), new.len())));
    for (ai, aj) in anchors {
        diff_gap(old, new, i..ai, j..aj, &mut entries);
        if ai < old.len() && aj < new.len() {
            entries.push(compare(aj, &old[ai], &new[aj]));
        }
        i = ai + 1;
        j = aj + 1;
    }
    entries
}

/// Positional comparison inside an unmatched run. Two blocks that both carry
/// (different) ids are never paired.
fn diff_gap(
    old: &[Block],
    new: &[Block],
    old_range: std::ops::Range<usize>,
    new_range: std::ops::Range<usize>,
    out: &mut Vec<DiffEntry>,
) {
    let len = old_range.len().max(new_range.len());
    for k in 0..len {
        let oi = old_range.start + k;
        let ni = new_range.start + k;
        let o = old_range.contains(&oi).then(|| &old[oi]);
        let n = new_range.contains(&ni).then(|| &new[ni]);
        match (o, n) {
            (Some(o), Some(n)) if o.id.is_none() || n.id.is_none() => {
                out.push(compare(ni, o, n));
            }
            (Some(o), Some(n)) => {
                out.push(DiffEntry::Deleted {
                    index: oi,
                    block: o.clone(),
                });
                out.push(DiffEntry::Added {
                    index: ni,
                    block: n.clone(),
                });
            }
            (Some(o), None) => out.push(DiffEntry::Deleted {
                index: oi,
                block: o.clone(),
            }),
            (None, Some(n)) => out.push(DiffEntry::Added {
                index: ni,
                block: n.clone(),
            }),
            (None, None) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Summary and document diff
// ---------------------------------------------------------------------------

/// Per-kind entry counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Count the entries of a diff.
    #[must_use]
    pub fn of(entries: &[DiffEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut s, e| {
            match e.kind() {
                DiffKind::Added => s.added += 1,
                DiffKind::Deleted => s.deleted += 1,
                DiffKind::Modified => s.modified += 1,
                DiffKind::Unchanged => s.unchanged += 1,
            }
            s
        })
    }

    /// Number of entries that are not unchanged.
    #[must_use]
    pub const fn changes(&self) -> usize {
        self.added + self.deleted + self.modified
    }

    #[must_use]
    pub const fn is_identical(&self) -> bool {
        self.changes() == 0
    }
}

/// Separator between block projections in [`document_text`].
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// All block projections joined by a blank line.
#[must_use]
pub fn document_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(project_to_text)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Character-level diff of two whole documents.
#[must_use]
pub fn document_text_diff(old: &[Block], new: &[Block]) -> Vec<TextChunk> {
    text_diff(&document_text(old), &document_text(new))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
