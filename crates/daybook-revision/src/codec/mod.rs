//! Reverse diffs between entry snapshots.
//!
//! A reverse diff is built against the *newer* text, so applying it to the
//! newer text recovers the older one.

pub mod diff;
pub mod matcher;
pub mod patch;

use crate::{CodecError, CodecResult};
use diff::{cleanup_semantic, diff_main, levenshtein, x_index, Op};
use matcher::{match_main, MAX_BITS};
use patch::PatchSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use patch::Hunk;

/// Fraction of a long fuzzily-located context that may differ before the
/// hunk is rejected.
const DELETE_THRESHOLD: f64 = 0.5;

/// Produces and applies reverse patches.
///
/// The revision store only talks to this seam, so tests can count or
/// sabotage patch applications.
pub trait PatchCodec: Send + Sync {
    /// Patch text that turns `after` back into `before`. Empty when they are equal.
    fn reverse_diff(&self, before: &str, after: &str) -> String;

    /// Apply patch text produced by [`PatchCodec::reverse_diff`] to `content`.
    fn apply(&self, patch: &str, content: &str) -> CodecResult<String>;
}

/// How strictly hunks must match the text they are applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Locate drifted context approximately. Compatible with histories whose
    /// entries were touched outside the journal, at the risk of a plausible
    /// but wrong reconstruction.
    #[default]
    Fuzzy,
    /// Apply a hunk only where its context appears verbatim at the expected offset.
    Exact,
}

/// How one hunk fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkOutcome {
    Exact,
    /// Applied, but found `offset` chars away or with altered context.
    Fuzzy { offset: isize },
    Failed,
}

/// Result of applying a patch set, hunk by hunk.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub text: String,
    pub hunks: Vec<HunkOutcome>,
}

impl ApplyReport {
    /// Indices of hunks that could not be located.
    pub fn failed(&self) -> Vec<usize> {
        self.hunks
            .iter()
            .enumerate()
            .filter(|(_, h)| **h == HunkOutcome::Failed)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_exact(&self) -> bool {
        self.hunks.iter().all(|h| *h == HunkOutcome::Exact)
    }

    /// `Ok` unless a hunk failed; the error still carries the best-effort text.
    pub fn into_result(self) -> CodecResult<String> {
        let failed = self.failed();
        if failed.is_empty() {
            Ok(self.text)
        } else {
            Err(CodecError::PatchApply {
                failed,
                total: self.hunks.len(),
                best_effort: self.text,
            })
        }
    }
}

/// The default codec: char-level diffs with semantic cleanup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffCodec {
    mode: MatchMode,
}

impl DiffCodec {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Reverse patch set turning `after` back into `before`.
    pub fn reverse_patches(&self, before: &str, after: &str) -> PatchSet {
        let mut diffs = diff_main(after, before);
        cleanup_semantic(&mut diffs);
        PatchSet::make(after, &diffs)
    }

    /// Apply each hunk in order, tracking the drift between expected and
    /// actual positions.
    pub fn apply_report(&self, patches: &PatchSet, content: &str) -> ApplyReport {
        let mut text: Vec<char> = content.chars().collect();
        let mut outcomes = Vec::with_capacity(patches.hunks().len());
        let mut delta: isize = 0;

        for hunk in patches.hunks() {
            let expected = (hunk.start2 as isize + delta).max(0) as usize;
            let source: Vec<char> = hunk.source_text().chars().collect();

            let Some((start, end)) = self.locate(&text, &source, expected) else {
                outcomes.push(HunkOutcome::Failed);
                delta -= hunk.length2 as isize - hunk.length1 as isize;
                continue;
            };
            delta = start as isize - expected as isize;

            let found_end = match end {
                Some(end) => (end + MAX_BITS).min(text.len()),
                None => (start + source.len()).min(text.len()),
            };
            let found = &text[start..found_end];

            if found == source.as_slice() {
                let target: Vec<char> = hunk.target_text().chars().collect();
                text.splice(start..start + source.len(), target);
                outcomes.push(if delta == 0 {
                    HunkOutcome::Exact
                } else {
                    HunkOutcome::Fuzzy { offset: delta }
                });
                continue;
            }

            // Context drifted: map each edit through a diff of expected vs found
            let expected_text: String = source.iter().collect();
            let found_text: String = found.iter().collect();
            let drift = diff_main(&expected_text, &found_text);
            if source.len() > MAX_BITS
                && levenshtein(&drift) as f64 / source.len() as f64 > DELETE_THRESHOLD
            {
                outcomes.push(HunkOutcome::Failed);
                continue;
            }

            let mut index1 = 0;
            for segment in &hunk.segments {
                let len = segment.len();
                match segment.op {
                    Op::Insert => {
                        let at = (start + x_index(&drift, index1)).min(text.len());
                        text.splice(at..at, segment.text.chars());
                    }
                    Op::Delete => {
                        let hi = (start + x_index(&drift, index1 + len)).min(text.len());
                        let lo = (start + x_index(&drift, index1)).min(hi);
                        text.drain(lo..hi);
                    }
                    Op::Equal => {}
                }
                if segment.op != Op::Delete {
                    index1 += len;
                }
            }
            outcomes.push(HunkOutcome::Fuzzy { offset: delta });
        }

        ApplyReport {
            text: text.into_iter().collect(),
            hunks: outcomes,
        }
    }

    /// Find where a hunk's source text sits. Long sources are located by
    /// their head and tail, returned as `(head, Some(tail))`.
    fn locate(
        &self,
        text: &[char],
        source: &[char],
        expected: usize,
    ) -> Option<(usize, Option<usize>)> {
        match self.mode {
            MatchMode::Exact => {
                let verbatim = text.get(expected..expected + source.len()) == Some(source);
                verbatim.then_some((expected, None))
            }
            MatchMode::Fuzzy if source.len() > MAX_BITS => {
                let head = match_main(text, &source[..MAX_BITS], expected)?;
                let tail = match_main(
                    text,
                    &source[source.len() - MAX_BITS..],
                    expected + source.len() - MAX_BITS,
                )?;
                (head < tail).then_some((head, Some(tail)))
            }
            MatchMode::Fuzzy => match_main(text, source, expected).map(|start| (start, None)),
        }
    }
}

impl PatchCodec for DiffCodec {
    fn reverse_diff(&self, before: &str, after: &str) -> String {
        self.reverse_patches(before, after).to_text()
    }

    fn apply(&self, patch: &str, content: &str) -> CodecResult<String> {
        let patches = PatchSet::from_text(patch)?;
        let report = self.apply_report(&patches, content);

        for (index, outcome) in report.hunks.iter().enumerate() {
            match outcome {
                HunkOutcome::Exact => {}
                HunkOutcome::Fuzzy { offset } => {
                    warn!(hunk = index, offset, "Patch hunk applied with fuzzy matching")
                }
                HunkOutcome::Failed => warn!(hunk = index, "Patch hunk could not be located"),
            }
        }
        debug!(hunks = report.hunks.len(), "Applied patch");

        report.into_result()
    }
}
