//! Rolling block hashes.
//!
//! The block hash of line `i` is a polynomial hash over the line hashes in
//! `[i - h, i + h]` where `h` is the half block size. Lines outside the file
//! contribute a zero term. Construction slides one window across the file,
//! so the total cost is O(n) rather than O(n * window).
//!
//! Arithmetic is `u64` with wraparound. Equal block hashes are a strong but
//! not certain signal that two neighbourhoods are identical.

use xxhash_rust::xxh3::xxh3_64;

use crate::LineHashSequence;

/// Lines considered on each side of the anchor line.
pub const DEFAULT_HALF_BLOCK_SIZE: usize = 5;

const PRIME_BASE: u64 = 31;

/// Numeric term of one line hash. Blank lines contribute zero, like lines
/// past either end of the file.
#[inline]
fn line_term(hash: &str) -> u64 {
    if hash.is_empty() { 0 } else { xxh3_64(hash.as_bytes()) }
}

// ---------------------------------------------------------------------------
// Rolling window
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RollingHash {
    /// `PRIME_BASE^(window - 1)`: weight of the oldest term in a full window.
    oldest_weight: u64,
    hash: u64,
}

impl RollingHash {
    fn new(half_block_size: usize) -> Self {
        let mut oldest_weight = 1_u64;
        for _ in 0..half_block_size * 2 {
            oldest_weight = oldest_weight.wrapping_mul(PRIME_BASE);
        }
        Self {
            oldest_weight,
            hash: 0,
        }
    }

    #[inline]
    fn push(&mut self, term: u64) {
        self.hash = self.hash.wrapping_mul(PRIME_BASE).wrapping_add(term);
    }

    #[inline]
    fn evict(&mut self, term: u64) {
        self.hash = self
            .hash
            .wrapping_sub(self.oldest_weight.wrapping_mul(term));
    }
}

// ---------------------------------------------------------------------------
// BlockHashSequence
// ---------------------------------------------------------------------------

/// One rolling block hash per line of a file version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHashSequence {
    half_block_size: usize,
    block_hashes: Vec<u64>,
}

impl BlockHashSequence {
    /// Block hashes with the default window of 5 lines on each side.
    #[must_use]
    pub fn new(lines: &LineHashSequence) -> Self {
        Self::with_half_block_size(lines, DEFAULT_HALF_BLOCK_SIZE)
    }

    #[must_use]
    pub fn with_half_block_size(lines: &LineHashSequence, half_block_size: usize) -> Self {
        let size = lines.len();
        let hashes = lines.hashes();
        let mut window = RollingHash::new(half_block_size);
        for line in 1..=half_block_size + 1 {
            window.push(hashes.get(line - 1).map_or(0, |hash| line_term(hash)));
        }

        let mut block_hashes = Vec::with_capacity(size);
        for line in 1..=size {
            block_hashes.push(window.hash);
            if line > half_block_size {
                window.evict(line_term(&hashes[line - half_block_size - 1]));
            }
            let incoming = line + half_block_size + 1;
            if incoming <= size {
                window.push(line_term(&hashes[incoming - 1]));
            } else {
                window.push(0);
            }
        }

        Self {
            half_block_size,
            block_hashes,
        }
    }

    #[must_use]
    pub const fn half_block_size(&self) -> usize {
        self.half_block_size
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.block_hashes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block_hashes.is_empty()
    }

    #[must_use]
    pub fn has_line(&self, line: u32) -> bool {
        line >= 1 && (line as usize) <= self.block_hashes.len()
    }

    /// Block hash of `line`.
    ///
    /// # Panics
    ///
    /// Panics when `line` is not a line of the file; callers check
    /// [`Self::has_line`] first.
    #[must_use]
    pub fn block_hash_for_line(&self, line: u32) -> u64 {
        assert!(
            self.has_line(line),
            "line {line} outside block hash sequence of {} lines",
            self.block_hashes.len()
        );
        self.block_hashes[line as usize - 1]
    }
}
