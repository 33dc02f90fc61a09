//! Locating patch context in text that may have drifted.
//!
//! Exact search first, then a bitap search that tolerates errors, scored by
//! both accuracy and distance from the expected location.

use std::collections::HashMap;

/// Longest pattern the bitap search handles (bits in the match mask).
pub const MAX_BITS: usize = 32;

/// Worst score still accepted as a match (0.0 perfect, 1.0 anything).
const MATCH_THRESHOLD: f64 = 0.5;

/// How far from the expected location a match may be before its score is spent.
const MATCH_DISTANCE: usize = 1000;

/// Find `pattern` in `text` as close to `loc` as possible.
pub fn match_main(text: &[char], pattern: &[char], loc: usize) -> Option<usize> {
    let loc = loc.min(text.len());
    if text == pattern {
        return Some(0);
    }
    if text.is_empty() {
        return None;
    }
    if text.get(loc..loc + pattern.len()) == Some(pattern) {
        return Some(loc);
    }
    if pattern.len() > MAX_BITS {
        return None;
    }
    match_bitap(text, pattern, loc)
}

fn match_bitap(text: &[char], pattern: &[char], loc: usize) -> Option<usize> {
    let alphabet = alphabet(pattern);
    let score = |errors: usize, x: usize| -> f64 {
        let accuracy = errors as f64 / pattern.len() as f64;
        accuracy + loc.abs_diff(x) as f64 / MATCH_DISTANCE as f64
    };

    let mut threshold = MATCH_THRESHOLD;
    // Exact occurrences bound the threshold from the start
    if let Some(found) = find_from(text, pattern, loc) {
        threshold = threshold.min(score(0, found));
        if let Some(found) = rfind_upto(text, pattern, loc + pattern.len()) {
            threshold = threshold.min(score(0, found));
        }
    }

    let match_mask: u64 = 1 << (pattern.len() - 1);
    let mut best_loc = None;
    let mut bin_max = pattern.len() + text.len();
    let mut last_rd: Vec<u64> = Vec::new();

    for d in 0..pattern.len() {
        // Binary search for how far from loc we can stray at this error level
        let mut bin_min = 0;
        let mut bin_mid = bin_max;
        while bin_min < bin_mid {
            if score(d, loc + bin_mid) <= threshold {
                bin_min = bin_mid;
            } else {
                bin_max = bin_mid;
            }
            bin_mid = (bin_max - bin_min) / 2 + bin_min;
        }
        bin_max = bin_mid;

        let mut start = (loc as isize - bin_mid as isize + 1).max(1) as usize;
        let finish = (loc + bin_mid).min(text.len()) + pattern.len();

        let mut rd = vec![0u64; finish + 2];
        rd[finish + 1] = (1u64 << d) - 1;

        let mut j = finish;
        while j >= start {
            let char_match = text
                .get(j - 1)
                .and_then(|c| alphabet.get(c))
                .copied()
                .unwrap_or(0);

            rd[j] = if d == 0 {
                ((rd[j + 1] << 1) | 1) & char_match
            } else {
                let prev = |i: usize| last_rd.get(i).copied().unwrap_or(0);
                (((rd[j + 1] << 1) | 1) & char_match)
                    | (((prev(j + 1) | prev(j)) << 1) | 1)
                    | prev(j + 1)
            };

            if rd[j] & match_mask != 0 {
                let candidate = score(d, j - 1);
                if candidate <= threshold {
                    threshold = candidate;
                    best_loc = Some(j - 1);
                    if j - 1 > loc {
                        // Don't overshoot: scan back no further than the mirror image
                        start = (2 * loc as isize - (j - 1) as isize).max(1) as usize;
                    } else {
                        break;
                    }
                }
            }
            j -= 1;
        }

        if score(d + 1, loc) > threshold {
            break;
        }
        last_rd = rd;
    }

    best_loc
}

fn alphabet(pattern: &[char]) -> HashMap<char, u64> {
    let mut masks = HashMap::new();
    for (i, c) in pattern.iter().enumerate() {
        *masks.entry(*c).or_insert(0) |= 1u64 << (pattern.len() - i - 1);
    }
    masks
}

/// First occurrence of `needle` starting at or after `from`.
pub fn find_from(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > hay.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()] == *needle)
}

/// Last occurrence of `needle` starting at or before `upto`.
pub fn rfind_upto(hay: &[char], needle: &[char], upto: usize) -> Option<usize> {
    if needle.len() > hay.len() {
        return None;
    }
    let last = (hay.len() - needle.len()).min(upto);
    (0..=last)
        .rev()
        .find(|&i| hay[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn alphabet_sets_bits_per_position() {
        let masks = alphabet(&chars("abc"));
        assert_eq!(masks[&'a'], 4);
        assert_eq!(masks[&'b'], 2);
        assert_eq!(masks[&'c'], 1);

        let masks = alphabet(&chars("abcaba"));
        assert_eq!(masks[&'a'], 37);
        assert_eq!(masks[&'b'], 18);
        assert_eq!(masks[&'c'], 8);
    }

    #[test]
    fn match_main_shortcuts() {
        assert_eq!(match_main(&chars("abcdef"), &chars("abcdef"), 1000), Some(0));
        assert_eq!(match_main(&chars(""), &chars("abcdef"), 1), None);
        assert_eq!(match_main(&chars("abcdef"), &chars(""), 3), Some(3));
        assert_eq!(match_main(&chars("abcdef"), &chars("de"), 3), Some(3));
    }

    #[test]
    fn bitap_finds_exact_matches() {
        assert_eq!(match_main(&chars("abcdefghijk"), &chars("fgh"), 5), Some(5));
        assert_eq!(match_main(&chars("abcdefghijk"), &chars("fgh"), 0), Some(5));
    }

    #[test]
    fn bitap_finds_fuzzy_matches() {
        assert_eq!(match_main(&chars("abcdefghijk"), &chars("efxhi"), 0), Some(4));
        assert_eq!(match_main(&chars("abcdefghijk"), &chars("cdefxyhijk"), 5), Some(2));
        assert_eq!(match_main(&chars("abcdefghijk"), &chars("bxy"), 1), None);
    }

    #[test]
    fn find_helpers() {
        let hay = chars("abcabc");
        assert_eq!(find_from(&hay, &chars("abc"), 1), Some(3));
        assert_eq!(rfind_upto(&hay, &chars("abc"), 2), Some(0));
        assert_eq!(rfind_upto(&hay, &chars("abc"), 10), Some(3));
        assert_eq!(find_from(&hay, &chars("abcabcabc"), 0), None);
    }
}
