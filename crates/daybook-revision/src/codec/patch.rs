//! Patch hunks and their plain-text form.
//!
//! The text form is one header per hunk followed by one line per segment:
//!
//! ```text
//! @@ -5,12 +5,7 @@
//!  o wo
//! -rld!%0A
//! +rld%0A
//! ```
//!
//! Starts are 1-based, a length of one is implied when omitted, and segment
//! text is percent-encoded so every segment fits on a single line.

use super::diff::{Op, Segment};
use super::matcher::MAX_BITS;
use crate::{CodecError, CodecResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Chars of context kept around each change.
pub const MARGIN: usize = 4;

/// Bytes left unescaped besides `A-Z a-z 0-9 - _ . ~`.
const UNESCAPED: &[u8] = b"!*'();/?:@&=+$,# ";

static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

fn header_regex() -> &'static Regex {
    HEADER_REGEX.get_or_init(|| {
        Regex::new(r"^@@ -(\d+),?(\d*) \+(\d+),?(\d*) @@$")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// One located change with its surrounding context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    pub segments: Vec<Segment>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

impl Hunk {
    /// Text this hunk expects to find.
    pub fn source_text(&self) -> String {
        super::diff::source_text(&self.segments)
    }

    /// Text this hunk leaves behind.
    pub fn target_text(&self) -> String {
        super::diff::target_text(&self.segments)
    }

    fn add_context(&mut self, text: &[char]) {
        if text.is_empty() {
            return;
        }

        let end = (self.start2 + self.length1).min(text.len());
        let start = self.start2.min(end);
        let mut pattern = &text[start..end];
        let mut padding = 0;

        // Grow the context until it is unique, within what the matcher can handle
        while super::matcher::find_from(text, pattern, 0)
            != super::matcher::rfind_upto(text, pattern, text.len())
            && pattern.len() < MAX_BITS - MARGIN - MARGIN
        {
            padding += MARGIN;
            let lo = start.saturating_sub(padding);
            let hi = (end + padding).min(text.len());
            pattern = &text[lo..hi];
        }
        padding += MARGIN;

        let prefix: String = text[start.saturating_sub(padding)..start].iter().collect();
        let suffix: String = text[end..(end + padding).min(text.len())].iter().collect();
        let prefix_len = prefix.chars().count();
        let suffix_len = suffix.chars().count();

        if !prefix.is_empty() {
            self.segments.insert(0, Segment::new(Op::Equal, prefix));
        }
        if !suffix.is_empty() {
            self.segments.push(Segment::new(Op::Equal, suffix));
        }

        self.start1 -= prefix_len;
        self.start2 -= prefix_len;
        self.length1 += prefix_len + suffix_len;
        self.length2 += prefix_len + suffix_len;
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            coords(self.start1, self.length1),
            coords(self.start2, self.length2)
        )?;
        for segment in &self.segments {
            let sign = match segment.op {
                Op::Insert => '+',
                Op::Delete => '-',
                Op::Equal => ' ',
            };
            writeln!(f, "{}{}", sign, encode(&segment.text))?;
        }
        Ok(())
    }
}

fn coords(start: usize, length: usize) -> String {
    match length {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, length),
    }
}

/// An ordered list of hunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    hunks: Vec<Hunk>,
}

impl PatchSet {
    /// Build hunks that turn `text1` into the target side of `diffs`.
    pub fn make(text1: &str, diffs: &[Segment]) -> Self {
        let mut hunks = Vec::new();
        let Some(last) = diffs.len().checked_sub(1) else {
            return Self { hunks };
        };

        let mut hunk = Hunk::default();
        let mut count1 = 0;
        let mut count2 = 0;
        // Context is taken from the text as it stands with earlier hunks applied
        let mut prepatch: Vec<char> = text1.chars().collect();
        let mut postpatch = prepatch.clone();

        for (x, segment) in diffs.iter().enumerate() {
            let chars: Vec<char> = segment.text.chars().collect();
            let len = chars.len();

            if hunk.segments.is_empty() && segment.op != Op::Equal {
                hunk.start1 = count1;
                hunk.start2 = count2;
            }

            match segment.op {
                Op::Insert => {
                    hunk.segments.push(segment.clone());
                    hunk.length2 += len;
                    postpatch.splice(count2..count2, chars);
                }
                Op::Delete => {
                    hunk.segments.push(segment.clone());
                    hunk.length1 += len;
                    postpatch.drain(count2..count2 + len);
                }
                Op::Equal => {
                    if len <= 2 * MARGIN && !hunk.segments.is_empty() && x != last {
                        hunk.segments.push(segment.clone());
                        hunk.length1 += len;
                        hunk.length2 += len;
                    } else if len >= 2 * MARGIN && !hunk.segments.is_empty() {
                        hunk.add_context(&prepatch);
                        hunks.push(std::mem::take(&mut hunk));
                        prepatch = postpatch.clone();
                        count1 = count2;
                    }
                }
            }

            if segment.op != Op::Insert {
                count1 += len;
            }
            if segment.op != Op::Delete {
                count2 += len;
            }
        }

        if !hunk.segments.is_empty() {
            hunk.add_context(&prepatch);
            hunks.push(hunk);
        }

        Self { hunks }
    }

    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Serialize to the on-disk text form. An empty set is an empty string.
    pub fn to_text(&self) -> String {
        self.hunks.iter().map(|h| h.to_string()).collect()
    }

    /// Parse the on-disk text form.
    pub fn from_text(text: &str) -> CodecResult<Self> {
        let mut hunks: Vec<Hunk> = Vec::new();

        for (index, line) in text.split('\n').enumerate() {
            let line_no = index + 1;
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = header_regex().captures(line) {
                let (start1, length1) = parse_coords(&caps[1], &caps[2], line_no)?;
                let (start2, length2) = parse_coords(&caps[3], &caps[4], line_no)?;
                hunks.push(Hunk {
                    segments: Vec::new(),
                    start1,
                    start2,
                    length1,
                    length2,
                });
                continue;
            }

            let hunk = hunks
                .last_mut()
                .ok_or_else(|| CodecError::malformed(line_no, "segment before first hunk header"))?;

            let mut chars = line.chars();
            let op = match chars.next() {
                Some('+') => Op::Insert,
                Some('-') => Op::Delete,
                Some(' ') => Op::Equal,
                Some(other) => {
                    return Err(CodecError::malformed(
                        line_no,
                        format!("invalid segment mode '{other}'"),
                    ))
                }
                None => continue,
            };
            let text = urlencoding::decode(chars.as_str())
                .map_err(|e| CodecError::malformed(line_no, format!("invalid encoding: {e}")))?;
            hunk.segments.push(Segment::new(op, text.into_owned()));
        }

        Ok(Self { hunks })
    }
}

fn parse_coords(start: &str, length: &str, line_no: usize) -> CodecResult<(usize, usize)> {
    let start: usize = start
        .parse()
        .map_err(|_| CodecError::malformed(line_no, "invalid hunk start"))?;

    match length {
        "" => start
            .checked_sub(1)
            .map(|s| (s, 1))
            .ok_or_else(|| CodecError::malformed(line_no, "hunk start must be positive")),
        "0" => Ok((start, 0)),
        _ => {
            let length: usize = length
                .parse()
                .map_err(|_| CodecError::malformed(line_no, "invalid hunk length"))?;
            start
                .checked_sub(1)
                .map(|s| (s, length))
                .ok_or_else(|| CodecError::malformed(line_no, "hunk start must be positive"))
        }
    }
}

/// Percent-encode segment text, keeping common punctuation readable.
fn encode(text: &str) -> String {
    let encoded = urlencoding::encode(text);
    let bytes = encoded.as_bytes();
    let mut out = String::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            match decoded {
                Some(byte) if UNESCAPED.contains(&byte) => out.push(byte as char),
                _ => out.push_str(&encoded[i..i + 3]),
            }
            i += 3;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }

    out
}
