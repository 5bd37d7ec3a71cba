//! Character-level text diff used to render a modified block.
//!
//! [`text_diff`] computes a minimal edit script over characters with Myers'
//! O(ND) algorithm in its linear-space (middle snake) form, then runs a
//! semantic cleanup pass:
//!
//! 1. **merge**: coalesce adjacent chunks of the same op, factor common
//!    prefixes/suffixes out of delete/insert runs and slide single edits
//!    sideways when that removes an equality.
//! 2. **semantic**: drop short equalities that are no longer than the edits
//!    on both sides of them, so `"x" → "y"` reads as one delete plus one
//!    insert.
//! 3. **lossless**: shift single edits left/right to the best-scoring
//!    boundary (blank line > line break > sentence end > whitespace >
//!    punctuation).
//! 4. **overlap**: turn a delete/insert pair that overlaps by at least half
//!    of either side into delete + equality + insert.
//!
//! The output is deterministic for a given pair of inputs. It is only used
//! for display; merge decisions never look at it.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The operation of a [`TextChunk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOp {
    /// Text present in both old and new.
    Equal,
    /// Text present only in new.
    Insert,
    /// Text present only in old.
    Delete,
}

/// One run of text with a single operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// What happened to this run.
    pub op: TextOp,
    /// The text of the run. Never empty in [`text_diff`] output.
    pub text: String,
}

impl TextChunk {
    /// Create a chunk.
    pub fn new(op: TextOp, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }
}

/// Compute the semantically cleaned diff from `old` to `new`.
///
/// Concatenating the `Equal` + `Delete` chunks reproduces `old`; concatenating
/// the `Equal` + `Insert` chunks reproduces `new`.
#[must_use]
pub fn text_diff(old: &str, new: &str) -> Vec<TextChunk> {
    let a: Vec<char> = old.chars().collect();
    let b: Vec<char> = new.chars().collect();
    let mut diffs = diff_chars(&a, &b);
    cleanup_semantic(&mut diffs);
    diffs
        .into_iter()
        .map(|d| TextChunk::new(d.op, d.text.into_iter().collect::<String>()))
        .collect()
}

/// Rebuild the old side of a diff.
#[must_use]
pub fn old_text(chunks: &[TextChunk]) -> String {
    chunks
        .iter()
        .filter(|c| c.op != TextOp::Insert)
        .map(|c| c.text.as_str())
        .collect()
}

/// Rebuild the new side of a diff.
#[must_use]
pub fn new_text(chunks: &[TextChunk]) -> String {
    chunks
        .iter()
        .filter(|c| c.op != TextOp::Delete)
        .map(|c| c.text.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Internal representation
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
struct Diff {
    op: TextOp,
    text: Vec<char>,
}

impl Diff {
    fn new(op: TextOp, text: &[char]) -> Self {
        Self {
            op,
            text: text.to_vec(),
        }
    }
}

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Length of the longest suffix of `a` that is also a prefix of `b`.
fn common_overlap(a: &[char], b: &[char]) -> usize {
    let max = a.len().min(b.len());
    (1..=max)
        .rev()
        .find(|&k| a[a.len() - k..] == b[..k])
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Core diff
// ---------------------------------------------------------------------------

fn diff_chars(a: &[char], b: &[char]) -> Vec<Diff> {
    if a == b {
        return if a.is_empty() {
            Vec::new()
        } else {
            vec![Diff::new(TextOp::Equal, a)]
        };
    }

    let prefix = common_prefix(a, b);
    let suffix = common_suffix(&a[prefix..], &b[prefix..]);
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut diffs = Vec::new();
    if prefix > 0 {
        diffs.push(Diff::new(TextOp::Equal, &a[..prefix]));
    }
    diffs.extend(compute(a_mid, b_mid));
    if suffix > 0 {
        diffs.push(Diff::new(TextOp::Equal, &a[a.len() - suffix..]));
    }
    cleanup_merge(&mut diffs);
    diffs
}

/// Diff two inputs that share no common prefix or suffix.
fn compute(a: &[char], b: &[char]) -> Vec<Diff> {
    if a.is_empty() {
        return vec![Diff::new(TextOp::Insert, b)];
    }
    if b.is_empty() {
        return vec![Diff::new(TextOp::Delete, a)];
    }

    let (long, short, op) = if a.len() > b.len() {
        (a, b, TextOp::Delete)
    } else {
        (b, a, TextOp::Insert)
    };
    if let Some(at) = long.windows(short.len()).position(|w| w == short) {
        return vec![
            Diff::new(op, &long[..at]),
            Diff::new(TextOp::Equal, short),
            Diff::new(op, &long[at + short.len()..]),
        ]
        .into_iter()
        .filter(|d| !d.text.is_empty())
        .collect();
    }
    if short.len() == 1 {
        // The single character does not occur in the other side.
        return vec![Diff::new(TextOp::Delete, a), Diff::new(TextOp::Insert, b)];
    }
    bisect(a, b)
}

/// Myers' middle snake: walk forward and reverse paths together until they
/// overlap, then split there and diff both halves. Memory is linear in the
/// input length.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn bisect(a: &[char], b: &[char]) -> Vec<Diff> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max_d = (n + m + 1) / 2;
    let v_offset = max_d;
    let v_length = 2 * max_d + 2;
    let mut v1 = vec![-1isize; v_length as usize];
    let mut v2 = vec![-1isize; v_length as usize];
    v1[(v_offset + 1) as usize] = 0;
    v2[(v_offset + 1) as usize] = 0;

    let delta = n - m;
    // An odd delta means the forward path finds the overlap.
    let front = delta % 2 != 0;
    let (mut k1_start, mut k1_end, mut k2_start, mut k2_end) = (0, 0, 0, 0);

    for d in 0..max_d {
        let mut k1 = -d + k1_start;
        while k1 <= d - k1_end {
            let k1_offset = (v_offset + k1) as usize;
            let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
                v1[k1_offset + 1]
            } else {
                v1[k1_offset - 1] + 1
            };
            let mut y1 = x1 - k1;
            while x1 < n && y1 < m && a[x1 as usize] == b[y1 as usize] {
                x1 += 1;
                y1 += 1;
            }
            v1[k1_offset] = x1;
            if x1 > n {
                k1_end += 2;
            } else if y1 > m {
                k1_start += 2;
            } else if front {
                let k2_offset = v_offset + delta - k1;
                if (0..v_length).contains(&k2_offset) && v2[k2_offset as usize] != -1 {
                    let x2 = n - v2[k2_offset as usize];
                    if x1 >= x2 {
                        return split(a, b, x1 as usize, y1 as usize);
                    }
                }
            }
            k1 += 2;
        }

        let mut k2 = -d + k2_start;
        while k2 <= d - k2_end {
            let k2_offset = (v_offset + k2) as usize;
            let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
                v2[k2_offset + 1]
            } else {
                v2[k2_offset - 1] + 1
            };
            let mut y2 = x2 - k2;
            while x2 < n && y2 < m && a[(n - x2 - 1) as usize] == b[(m - y2 - 1) as usize] {
                x2 += 1;
                y2 += 1;
            }
            v2[k2_offset] = x2;
            if x2 > n {
                k2_end += 2;
            } else if y2 > m {
                k2_start += 2;
            } else if !front {
                let k1_offset = v_offset + delta - k2;
                if (0..v_length).contains(&k1_offset) && v1[k1_offset as usize] != -1 {
                    let x1 = v1[k1_offset as usize];
                    let y1 = v_offset + x1 - k1_offset;
                    if x1 >= n - x2 {
                        return split(a, b, x1 as usize, y1 as usize);
                    }
                }
            }
            k2 += 2;
        }
    }

    // No common subsequence at all.
    vec![Diff::new(TextOp::Delete, a), Diff::new(TextOp::Insert, b)]
}

fn split(a: &[char], b: &[char], x: usize, y: usize) -> Vec<Diff> {
    let mut diffs = diff_chars(&a[..x], &b[..y]);
    diffs.extend(diff_chars(&a[x..], &b[y..]));
    diffs
}

// ---------------------------------------------------------------------------
// Cleanup: merge
// ---------------------------------------------------------------------------

/// Coalesce like ops, factor shared affixes out of edit runs, and slide
/// single edits over neighbouring equalities where that removes one.
fn cleanup_merge(diffs: &mut Vec<Diff>) {
    loop {
        merge_runs(diffs);
        if !shift_single_edits(diffs) {
            break;
        }
    }
}

fn merge_runs(diffs: &mut Vec<Diff>) {
    // Sentinel so the trailing edit run is flushed.
    diffs.push(Diff::new(TextOp::Equal, &[]));
    let mut pointer = 0;
    let mut count_delete = 0;
    let mut count_insert = 0;
    let mut text_delete: Vec<char> = Vec::new();
    let mut text_insert: Vec<char> = Vec::new();

    while pointer < diffs.len() {
        match diffs[pointer].op {
            TextOp::Insert => {
                count_insert += 1;
                text_insert.extend_from_slice(&diffs[pointer].text);
                pointer += 1;
            }
            TextOp::Delete => {
                count_delete += 1;
                text_delete.extend_from_slice(&diffs[pointer].text);
                pointer += 1;
            }
            TextOp::Equal => {
                if count_delete + count_insert > 1 {
                    if count_delete != 0 && count_insert != 0 {
                        let prefix = common_prefix(&text_insert, &text_delete);
                        if prefix != 0 {
                            let run_start = pointer - count_delete - count_insert;
                            if run_start > 0 && diffs[run_start - 1].op == TextOp::Equal {
                                diffs[run_start - 1]
                                    .text
                                    .extend_from_slice(&text_insert[..prefix]);
                            } else {
                                diffs.insert(0, Diff::new(TextOp::Equal, &text_insert[..prefix]));
                                pointer += 1;
                            }
                            text_insert.drain(..prefix);
                            text_delete.drain(..prefix);
                        }
                        let suffix = common_suffix(&text_insert, &text_delete);
                        if suffix != 0 {
                            let mut merged = text_insert[text_insert.len() - suffix..].to_vec();
                            merged.extend_from_slice(&diffs[pointer].text);
                            diffs[pointer].text = merged;
                            text_insert.truncate(text_insert.len() - suffix);
                            text_delete.truncate(text_delete.len() - suffix);
                        }
                    }
                    let run_start = pointer - count_delete - count_insert;
                    let mut replacement = Vec::with_capacity(2);
                    if !text_delete.is_empty() {
                        replacement.push(Diff::new(TextOp::Delete, &text_delete));
                    }
                    if !text_insert.is_empty() {
                        replacement.push(Diff::new(TextOp::Insert, &text_insert));
                    }
                    let replaced = replacement.len();
                    diffs.splice(run_start..pointer, replacement);
                    pointer = run_start + replaced + 1;
                } else if pointer != 0 && diffs[pointer - 1].op == TextOp::Equal {
                    let text = diffs.remove(pointer).text;
                    diffs[pointer - 1].text.extend(text);
                } else {
                    pointer += 1;
                }
                count_delete = 0;
                count_insert = 0;
                text_delete.clear();
                text_insert.clear();
            }
        }
    }
    diffs.retain(|d| !d.text.is_empty());
}

/// `A<ins>BA</ins>C` → `<ins>AB</ins>AC` and the mirror image.
fn shift_single_edits(diffs: &mut Vec<Diff>) -> bool {
    let mut changed = false;
    let mut pointer = 1;
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].op == TextOp::Equal && diffs[pointer + 1].op == TextOp::Equal {
            let prev = diffs[pointer - 1].text.clone();
            let next = diffs[pointer + 1].text.clone();
            let edit = diffs[pointer].text.clone();
            if edit.ends_with(&prev) {
                let mut shifted = prev.clone();
                shifted.extend_from_slice(&edit[..edit.len() - prev.len()]);
                diffs[pointer].text = shifted;
                let mut following = prev;
                following.extend_from_slice(&next);
                diffs[pointer + 1].text = following;
                diffs.remove(pointer - 1);
                changed = true;
            } else if edit.starts_with(&next) {
                diffs[pointer - 1].text.extend_from_slice(&next);
                let mut shifted = edit[next.len()..].to_vec();
                shifted.extend_from_slice(&next);
                diffs[pointer].text = shifted;
                diffs.remove(pointer + 1);
                changed = true;
            }
        }
        pointer += 1;
    }
    changed
}

// ---------------------------------------------------------------------------
// Cleanup: semantic
// ---------------------------------------------------------------------------

#[allow(clippy::similar_names)]
fn cleanup_semantic(diffs: &mut Vec<Diff>) {
    let mut changed = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;
    let mut pointer = 0;
    // Edit lengths before (1) and after (2) the last equality.
    let (mut ins1, mut del1, mut ins2, mut del2) = (0usize, 0usize, 0usize, 0usize);

    while pointer < diffs.len() {
        if diffs[pointer].op == TextOp::Equal {
            equalities.push(pointer);
            ins1 = ins2;
            del1 = del2;
            ins2 = 0;
            del2 = 0;
            last_equality = Some(diffs[pointer].text.clone());
        } else {
            if diffs[pointer].op == TextOp::Insert {
                ins2 += diffs[pointer].text.len();
            } else {
                del2 += diffs[pointer].text.len();
            }
            if let (Some(eq), Some(&at)) = (&last_equality, equalities.last())
                && eq.len() <= ins1.max(del1)
                && eq.len() <= ins2.max(del2)
            {
                // Replace the equality with a delete + insert of its text.
                let eq = eq.clone();
                diffs.insert(at, Diff::new(TextOp::Delete, &eq));
                diffs[at + 1].op = TextOp::Insert;
                equalities.pop();
                equalities.pop();
                ins1 = 0;
                del1 = 0;
                ins2 = 0;
                del2 = 0;
                last_equality = None;
                changed = true;
                pointer = equalities.last().map_or(0, |&i| i + 1);
                continue;
            }
        }
        pointer += 1;
    }

    if changed {
        cleanup_merge(diffs);
    }
    cleanup_semantic_lossless(diffs);
    eliminate_overlaps(diffs);
}

// ---------------------------------------------------------------------------
// Cleanup: lossless boundary shifting
// ---------------------------------------------------------------------------

fn boundary_score(one: &[char], two: &[char]) -> u8 {
    let (Some(&c1), Some(&c2)) = (one.last(), two.first()) else {
        return 6;
    };
    let non_alnum1 = !c1.is_alphanumeric();
    let non_alnum2 = !c2.is_alphanumeric();
    let ws1 = non_alnum1 && c1.is_whitespace();
    let ws2 = non_alnum2 && c2.is_whitespace();
    let break1 = ws1 && (c1 == '\n' || c1 == '\r');
    let break2 = ws2 && (c2 == '\n' || c2 == '\r');
    let blank1 = break1 && ends_with_blank_line(one);
    let blank2 = break2 && starts_with_blank_line(two);

    if blank1 || blank2 {
        5
    } else if break1 || break2 {
        4
    } else if non_alnum1 && !ws1 && ws2 {
        3
    } else if ws1 || ws2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

fn ends_with_blank_line(text: &[char]) -> bool {
    text.ends_with(&['\n', '\n']) || text.ends_with(&['\n', '\r', '\n'])
}

fn starts_with_blank_line(text: &[char]) -> bool {
    let rest = match text {
        ['\r', '\n', rest @ ..] | ['\n', rest @ ..] => rest,
        _ => return false,
    };
    rest.starts_with(&['\n']) || rest.starts_with(&['\r', '\n'])
}

fn cleanup_semantic_lossless(diffs: &mut Vec<Diff>) {
    let mut pointer = 1;
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].op == TextOp::Equal && diffs[pointer + 1].op == TextOp::Equal {
            let mut eq1 = diffs[pointer - 1].text.clone();
            let mut edit = diffs[pointer].text.clone();
            let mut eq2 = diffs[pointer + 1].text.clone();

            // Shift the edit as far left as possible.
            let offset = common_suffix(&eq1, &edit);
            if offset > 0 {
                let common = edit[edit.len() - offset..].to_vec();
                eq1.truncate(eq1.len() - offset);
                let mut shifted = common.clone();
                shifted.extend_from_slice(&edit[..edit.len() - offset]);
                edit = shifted;
                let mut following = common;
                following.extend_from_slice(&eq2);
                eq2 = following;
            }

            // Then step right one character at a time, keeping the best fit.
            let mut best = (eq1.clone(), edit.clone(), eq2.clone());
            let mut best_score = boundary_score(&eq1, &edit) + boundary_score(&edit, &eq2);
            while !edit.is_empty() && !eq2.is_empty() && edit[0] == eq2[0] {
                let c = edit.remove(0);
                eq1.push(c);
                edit.push(eq2.remove(0));
                let score = boundary_score(&eq1, &edit) + boundary_score(&edit, &eq2);
                if score >= best_score {
                    best_score = score;
                    best = (eq1.clone(), edit.clone(), eq2.clone());
                }
            }

            if diffs[pointer - 1].text != best.0 {
                let (best_eq1, best_edit, best_eq2) = best;
                if best_eq1.is_empty() {
                    diffs.remove(pointer - 1);
                    pointer -= 1;
                } else {
                    diffs[pointer - 1].text = best_eq1;
                }
                diffs[pointer].text = best_edit;
                if best_eq2.is_empty() {
                    diffs.remove(pointer + 1);
                    pointer = pointer.saturating_sub(1);
                } else {
                    diffs[pointer + 1].text = best_eq2;
                }
            }
        }
        pointer += 1;
    }
}

// ---------------------------------------------------------------------------
// Cleanup: overlap elimination
// ---------------------------------------------------------------------------

fn eliminate_overlaps(diffs: &mut Vec<Diff>) {
    let mut pointer = 1;
    while pointer < diffs.len() {
        if diffs[pointer - 1].op == TextOp::Delete && diffs[pointer].op == TextOp::Insert {
            let deletion = diffs[pointer - 1].text.clone();
            let insertion = diffs[pointer].text.clone();
            let overlap1 = common_overlap(&deletion, &insertion);
            let overlap2 = common_overlap(&insertion, &deletion);
            if overlap1 >= overlap2 {
                if overlap1 > 0
                    && (overlap1 * 2 >= deletion.len() || overlap1 * 2 >= insertion.len())
                {
                    diffs.insert(pointer, Diff::new(TextOp::Equal, &insertion[..overlap1]));
                    diffs[pointer - 1].text = deletion[..deletion.len() - overlap1].to_vec();
                    diffs[pointer + 1].text = insertion[overlap1..].to_vec();
                    pointer += 1;
                }
            } else if overlap2 * 2 >= deletion.len() || overlap2 * 2 >= insertion.len() {
                // Reverse overlap: swap into insert + equality + delete.
                diffs.insert(pointer, Diff::new(TextOp::Equal, &deletion[..overlap2]));
                diffs[pointer - 1] =
                    Diff::new(TextOp::Insert, &insertion[..insertion.len() - overlap2]);
                diffs[pointer + 1] = Diff::new(TextOp::Delete, &deletion[overlap2..]);
                pointer += 1;
            }
            pointer += 1;
        }
        pointer += 1;
    }
    diffs.retain(|d| !d.text.is_empty());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
