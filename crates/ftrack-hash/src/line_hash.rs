//! Per-line content hashes.
//!
//! Lines are normalized by dropping every whitespace character, then hashed
//! with BLAKE3 (hex). A line that is empty after normalization hashes to the
//! empty string, which can never collide with the hash of real content.

use hashbrown::HashMap;
use smallvec::SmallVec;

/// Strip all whitespace from a line.
#[must_use]
pub fn normalize_line(line: &str) -> String {
    line.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Content hash of one line of text.
#[must_use]
pub fn hash_line(line: &str) -> String {
    let normalized = normalize_line(line);
    if normalized.is_empty() {
        return String::new();
    }
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}

/// Ordered content hashes of a file version, 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineHashSequence {
    hashes: Vec<String>,
    lines_by_hash: HashMap<String, SmallVec<[u32; 2]>>,
}

impl LineHashSequence {
    /// Build from already computed line hashes (e.g. loaded from storage).
    #[must_use]
    pub fn new(hashes: Vec<String>) -> Self {
        let mut lines_by_hash: HashMap<String, SmallVec<[u32; 2]>> = HashMap::new();
        for (idx, hash) in hashes.iter().enumerate() {
            lines_by_hash
                .entry_ref(hash.as_str())
                .or_default()
                .push(idx as u32 + 1);
        }
        Self {
            hashes,
            lines_by_hash,
        }
    }

    /// Hash every line of a file version, in order.
    #[must_use]
    pub fn for_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            lines
                .into_iter()
                .map(|line| hash_line(line.as_ref()))
                .collect(),
        )
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Whether `line` is a valid 1-based line of this file.
    #[must_use]
    pub fn has_line(&self, line: u32) -> bool {
        line >= 1 && (line as usize) <= self.hashes.len()
    }

    /// Hash of `line`; empty for blank or out-of-range lines.
    #[must_use]
    pub fn hash_for_line(&self, line: u32) -> &str {
        if self.has_line(line) {
            &self.hashes[line as usize - 1]
        } else {
            ""
        }
    }

    /// All lines sharing `hash`, ascending.
    #[must_use]
    pub fn lines_for_hash(&self, hash: &str) -> &[u32] {
        self.lines_by_hash
            .get(hash)
            .map(|lines| lines.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn hashes(&self) -> &[String] {
        &self.hashes
    }
}
