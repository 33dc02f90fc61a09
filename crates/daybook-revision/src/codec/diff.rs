//! Character-level diffs with semantic cleanup.
//!
//! Diffs are computed with `similar` and post-processed into a compact list
//! of [`Segment`]s. All lengths are counted in chars, never bytes.

use similar::{Algorithm, ChangeTag, TextDiff};
use std::time::Duration;

/// Upper bound on time spent computing one diff.
const DIFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Kind of a diff segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Delete,
    Insert,
    Equal,
}

/// A run of text that is deleted, inserted or shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub op: Op,
    pub text: String,
}

impl Segment {
    pub fn new(op: Op, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Compute the diff turning `old` into `new`.
pub fn diff_main(old: &str, new: &str) -> Vec<Segment> {
    if old == new {
        if old.is_empty() {
            return Vec::new();
        }
        return vec![Segment::new(Op::Equal, old)];
    }

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_TIMEOUT)
        .diff_chars(old, new);

    let mut segments: Vec<Segment> = Vec::new();
    for change in diff.iter_all_changes() {
        let op = match change.tag() {
            ChangeTag::Equal => Op::Equal,
            ChangeTag::Delete => Op::Delete,
            ChangeTag::Insert => Op::Insert,
        };
        match segments.last_mut() {
            Some(last) if last.op == op => last.text.push_str(change.value()),
            _ => segments.push(Segment::new(op, change.value())),
        }
    }

    cleanup_merge(&mut segments);
    segments
}

/// Fold short equalities that sit between larger edits into those edits.
///
/// An equality no longer than the edits on both of its sides carries no
/// useful alignment and only fragments the patch.
pub fn cleanup_semantic(diffs: &mut Vec<Segment>) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let mut pointer: isize = 0;
    // Edit lengths before and after the last equality
    let (mut ins_before, mut del_before) = (0usize, 0usize);
    let (mut ins_after, mut del_after) = (0usize, 0usize);

    while (pointer as usize) < diffs.len() {
        let p = pointer as usize;
        if diffs[p].op == Op::Equal {
            equalities.push(p);
            ins_before = ins_after;
            del_before = del_after;
            ins_after = 0;
            del_after = 0;
            last_equality = Some(diffs[p].text.clone());
        } else {
            if diffs[p].op == Op::Insert {
                ins_after += diffs[p].len();
            } else {
                del_after += diffs[p].len();
            }

            let fold = match &last_equality {
                Some(eq) => {
                    let eq_len = eq.chars().count();
                    (eq_len <= ins_before.max(del_before) && eq_len <= ins_after.max(del_after))
                        .then(|| eq.clone())
                }
                None => None,
            };

            if let (Some(eq), Some(&at)) = (fold, equalities.last()) {
                diffs.insert(at, Segment::new(Op::Delete, eq));
                diffs[at + 1].op = Op::Insert;
                equalities.pop();
                // The previous equality needs to be re-evaluated
                equalities.pop();
                pointer = equalities.last().map(|&i| i as isize).unwrap_or(-1);
                ins_before = 0;
                del_before = 0;
                ins_after = 0;
                del_after = 0;
                last_equality = None;
                changes = true;
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }
}

/// Merge adjacent segments of the same kind and factor shared prefixes and
/// suffixes out of delete/insert pairs.
pub fn cleanup_merge(diffs: &mut Vec<Segment>) {
    let mut out: Vec<Segment> = Vec::with_capacity(diffs.len());
    let mut deleted = String::new();
    let mut inserted = String::new();

    for segment in diffs.drain(..) {
        match segment.op {
            Op::Delete => deleted.push_str(&segment.text),
            Op::Insert => inserted.push_str(&segment.text),
            Op::Equal => {
                flush_edits(&mut out, &mut deleted, &mut inserted);
                push_equal(&mut out, &segment.text);
            }
        }
    }
    flush_edits(&mut out, &mut deleted, &mut inserted);

    *diffs = out;
}

fn flush_edits(out: &mut Vec<Segment>, deleted: &mut String, inserted: &mut String) {
    let mut suffix = String::new();

    if !deleted.is_empty() && !inserted.is_empty() {
        let prefix_len = common_prefix_bytes(deleted, inserted);
        if prefix_len > 0 {
            push_equal(out, &deleted[..prefix_len]);
            deleted.drain(..prefix_len);
            inserted.drain(..prefix_len);
        }

        let suffix_len = common_suffix_bytes(deleted, inserted);
        if suffix_len > 0 {
            suffix = inserted[inserted.len() - suffix_len..].to_string();
            deleted.truncate(deleted.len() - suffix_len);
            inserted.truncate(inserted.len() - suffix_len);
        }
    }

    if !deleted.is_empty() {
        out.push(Segment::new(Op::Delete, std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        out.push(Segment::new(Op::Insert, std::mem::take(inserted)));
    }
    push_equal(out, &suffix);
}

fn push_equal(out: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.op == Op::Equal => last.text.push_str(text),
        _ => out.push(Segment::new(Op::Equal, text)),
    }
}

/// Byte length of the common prefix, always on a char boundary.
fn common_prefix_bytes(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Byte length of the common suffix, always on a char boundary.
fn common_suffix_bytes(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Text of the source side (everything but insertions).
pub fn source_text(diffs: &[Segment]) -> String {
    diffs
        .iter()
        .filter(|s| s.op != Op::Insert)
        .map(|s| s.text.as_str())
        .collect()
}

/// Text of the target side (everything but deletions).
pub fn target_text(diffs: &[Segment]) -> String {
    diffs
        .iter()
        .filter(|s| s.op != Op::Delete)
        .map(|s| s.text.as_str())
        .collect()
}

/// Number of inserted, deleted or substituted chars.
pub fn levenshtein(diffs: &[Segment]) -> usize {
    let mut distance = 0;
    let mut insertions = 0;
    let mut deletions = 0;
    for segment in diffs {
        match segment.op {
            Op::Insert => insertions += segment.len(),
            Op::Delete => deletions += segment.len(),
            Op::Equal => {
                distance += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }
    distance + insertions.max(deletions)
}

/// Map a char offset in the source text to the equivalent offset in the target.
pub fn x_index(diffs: &[Segment], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;
    let mut last_chars1 = 0;
    let mut last_chars2 = 0;
    let mut overshoot: Option<&Segment> = None;

    for segment in diffs {
        let len = segment.len();
        if segment.op != Op::Insert {
            chars1 += len;
        }
        if segment.op != Op::Delete {
            chars2 += len;
        }
        if chars1 > loc {
            overshoot = Some(segment);
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }

    match overshoot {
        // The location was deleted
        Some(segment) if segment.op == Op::Delete => last_chars2,
        _ => last_chars2 + (loc - last_chars1),
    }
}
