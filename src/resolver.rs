//! Error-code resolver: maps free-text bank error messages to canonical codes
//!
//! Bank APIs return inconsistent, evolving free text for the same business
//! rule. Known messages are matched (exactly, then fuzzily) against a fixed
//! per-bank table; anything below the similarity threshold falls back to a
//! CRC32 checksum of the raw message so the caller still gets a stable,
//! collision-resistant identifier.

use tracing::warn;

/// Lowercase, fold accented vowels/ç/ñ to their base letter, then strip
/// every character outside `[a-z0-9 ]`. Idempotent on normalized input.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        };
        if folded.is_ascii_lowercase() || folded.is_ascii_digit() || folded == ' ' {
            out.push(folded);
        }
    }
    out
}

fn longest_common_run(a: &[u8], b: &[u8]) -> (usize, usize, usize) {
    let (mut max, mut pos_a, mut pos_b) = (0usize, 0usize, 0usize);
    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut l = 0;
            while i + l < a.len() && j + l < b.len() && a[i + l] == b[j + l] {
                l += 1;
            }
            if l > max {
                max = l;
                pos_a = i;
                pos_b = j;
            }
        }
    }
    (max, pos_a, pos_b)
}

fn common_chars(a: &[u8], b: &[u8]) -> usize {
    let (max, pos_a, pos_b) = longest_common_run(a, b);
    if max == 0 {
        return 0;
    }
    max + common_chars(&a[..pos_a], &b[..pos_b])
        + common_chars(&a[pos_a + max..], &b[pos_b + max..])
}

/// Character-similarity percentage between two strings: twice the number of
/// matching characters (longest common substring, recursing on the pieces
/// left and right of it) over the combined length.
pub fn similarity(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    common_chars(a.as_bytes(), b.as_bytes()) as f64 * 200.0 / total as f64
}

/// A fixed, ordered table of known bank error strings.
///
/// Declaration order is part of the contract: when two entries tie on
/// similarity, the first one wins.
#[derive(Debug, Clone, Copy)]
pub struct ErrorTable {
    entries: &'static [(i32, &'static str)],
    threshold: f64,
}

impl ErrorTable {
    /// Table with the default 70% similarity threshold
    pub const fn new(entries: &'static [(i32, &'static str)]) -> Self {
        ErrorTable {
            entries,
            threshold: 70.0,
        }
    }

    /// Override the similarity threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Best-matching canonical code for a free-text message, or `None` when
    /// nothing clears the threshold. Exact normalized matches win outright;
    /// otherwise the highest-similarity entry is taken, first-in-table-order
    /// on ties.
    pub fn resolve(&self, message: &str) -> Option<i32> {
        let needle = normalize(message);
        let mut best: Option<i32> = None;
        let mut highest = 0.0f64;

        for (code, entry) in self.entries {
            let candidate = normalize(entry);
            if candidate == needle {
                return Some(*code);
            }
            let percent = similarity(&candidate, &needle);
            if percent > highest {
                highest = percent;
                best = Some(*code);
            }
        }

        if highest > self.threshold {
            best
        } else {
            if let Some(code) = best {
                // near misses are worth curating into the table
                warn!(
                    code,
                    similarity = highest,
                    message,
                    "unmatched bank error below similarity threshold"
                );
            }
            None
        }
    }
}

/// Synthetic code for messages the table does not know: CRC32 of the
/// trimmed raw text. Pure function of its input.
pub fn checksum_code(message: &str) -> u32 {
    crc32fast::hash(message.trim().as_bytes())
}
