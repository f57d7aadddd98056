//! Detection of blocks of code that moved between two file versions.
//!
//! Works on block hashes only, no textual diff:
//! 1. group still-unmatched line-bound trackables of each side by line;
//! 2. a block hash seen on exactly one base line and exactly one raw line
//!    is a certain move: map those two lines, drop them from the grouping;
//! 3. unless the remaining line combinations reach the pair limit, weigh
//!    every (base line, raw line) pair by the length of the longest run of
//!    equal line hashes through both anchors and map pairs greedily, heavier
//!    first, shorter moves first among equals.
//!
//! Mapping a base line to a raw line pairs each raw trackable on the raw
//! line with the first still-unmatched base trackable of the same rule on
//! the base line.

use std::collections::BTreeMap;

use ftrack_error::{Result, TrackError};
use ftrack_hash::LineHashSequence;
use ftrack_types::Trackable;
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::config::DEFAULT_MOVE_DETECTION_PAIR_LIMIT;
use crate::tracking::{BaseId, RawId, Tracking};

type ByLine<Id> = BTreeMap<u32, SmallVec<[Id; 2]>>;

/// Counters of one move-detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveReport {
    /// Matches found through block hashes unique on both sides.
    pub unique_matches: usize,
    /// Matches found through weighted line pairs.
    pub weighted_matches: usize,
    /// The pair limit was reached and weighted pairing was skipped.
    pub pair_limit_reached: bool,
}

impl MoveReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.unique_matches + self.weighted_matches
    }
}

#[derive(Debug, Default)]
struct HashOccurrence {
    base_line: u32,
    base_count: usize,
    raw_line: u32,
    raw_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct LinePair {
    base_line: u32,
    raw_line: u32,
    weight: usize,
}

impl LinePair {
    const fn distance(&self) -> u32 {
        self.base_line.abs_diff(self.raw_line)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockRecognizer {
    pair_limit: usize,
}

impl Default for BlockRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_MOVE_DETECTION_PAIR_LIMIT)
    }
}

impl BlockRecognizer {
    #[must_use]
    pub const fn new(pair_limit: usize) -> Self {
        Self { pair_limit }
    }

    #[must_use]
    pub const fn pair_limit(&self) -> usize {
        self.pair_limit
    }

    /// Match moved trackables in place.
    ///
    /// # Errors
    ///
    /// Returns [`ftrack_error::TrackError::LineSource`] when the lines of
    /// either side cannot be read. Lines are only read when both sides still
    /// have line-bound candidates.
    pub fn match_moves<R: Trackable, B: Trackable>(
        &self,
        tracking: &mut Tracking<'_, R, B>,
    ) -> Result<MoveReport> {
        let mut report = MoveReport::default();
        if tracking.is_complete() {
            return Ok(report);
        }

        let mut raws_by_line: ByLine<RawId> = BTreeMap::new();
        for id in tracking.unmatched_raws() {
            if let Some(line) = tracking.raw(id).line() {
                raws_by_line.entry(line).or_default().push(id);
            }
        }
        let mut bases_by_line: ByLine<BaseId> = BTreeMap::new();
        for id in tracking.unmatched_bases() {
            if let Some(line) = tracking.base(id).line() {
                bases_by_line.entry(line).or_default().push(id);
            }
        }
        if raws_by_line.is_empty() || bases_by_line.is_empty() {
            return Ok(report);
        }

        let raw_input = tracking.raw_input();
        let base_input = tracking.base_input();
        let raw_blocks = raw_input.block_hash_sequence()?;
        let base_blocks = base_input.block_hash_sequence()?;
        // Stored base lines may point past the end of their file.
        raws_by_line.retain(|&line, _| raw_blocks.has_line(line));
        bases_by_line.retain(|&line, _| base_blocks.has_line(line));

        let mut occurrences: HashMap<u64, HashOccurrence> = HashMap::new();
        for &line in bases_by_line.keys() {
            let occurrence = occurrences
                .entry(base_blocks.block_hash_for_line(line))
                .or_default();
            if occurrence.base_count == 0 {
                occurrence.base_line = line;
            }
            occurrence.base_count += 1;
        }
        for &line in raws_by_line.keys() {
            if let Some(occurrence) = occurrences.get_mut(&raw_blocks.block_hash_for_line(line)) {
                occurrence.raw_line = line;
                occurrence.raw_count += 1;
            }
        }

        let mut unique: Vec<(u32, u32)> = occurrences
            .values()
            .filter(|occ| occ.base_count == 1 && occ.raw_count == 1)
            .map(|occ| (occ.base_line, occ.raw_line))
            .collect();
        unique.sort_unstable();
        for (base_line, raw_line) in unique {
            if let (Some(raws), Some(bases)) = (
                raws_by_line.remove(&raw_line),
                bases_by_line.remove(&base_line),
            ) {
                report.unique_matches += map_lines(tracking, &raws, &bases);
            }
        }

        let combinations = bases_by_line.len().saturating_mul(raws_by_line.len());
        if combinations >= self.pair_limit {
            report.pair_limit_reached = true;
            info!(
                base_lines = bases_by_line.len(),
                raw_lines = raws_by_line.len(),
                limit = self.pair_limit,
                unique_matches = report.unique_matches,
                "move detection limited to unique block hashes"
            );
            return Ok(report);
        }

        let raw_lines = raw_input.line_hash_sequence()?;
        let base_lines = base_input.line_hash_sequence()?;
        let mut pairs = Vec::new();
        for &base_line in bases_by_line.keys() {
            for &raw_line in raws_by_line.keys() {
                let weight = length_of_maximal_block(base_lines, base_line, raw_lines, raw_line);
                if weight > 0 {
                    pairs.push(LinePair {
                        base_line,
                        raw_line,
                        weight,
                    });
                }
            }
        }
        pairs.sort_by(|a, b| {
            b.weight
                .cmp(&a.weight)
                .then_with(|| a.distance().cmp(&b.distance()))
        });
        let candidates = pairs.len();
        for pair in pairs {
            if tracking.is_complete() {
                break;
            }
            let (Some(raws), Some(bases)) = (
                raws_by_line.get(&pair.raw_line),
                bases_by_line.get(&pair.base_line),
            ) else {
                return Err(TrackError::internal(format!(
                    "weighted pair ({}, {}) refers to a line without candidates",
                    pair.base_line, pair.raw_line
                )));
            };
            report.weighted_matches += map_lines(tracking, raws, bases);
        }

        debug!(
            unique_matches = report.unique_matches,
            weighted_candidates = candidates,
            weighted_matches = report.weighted_matches,
            "move detection complete"
        );
        Ok(report)
    }
}

/// Pair each unmatched raw with the first unmatched base of the same rule.
fn map_lines<R: Trackable, B: Trackable>(
    tracking: &mut Tracking<'_, R, B>,
    raws: &[RawId],
    bases: &[BaseId],
) -> usize {
    let mut matched = 0;
    for &raw in raws {
        if !tracking.contains_unmatched_raw(raw) {
            continue;
        }
        let rule_key = tracking.raw(raw).rule_key();
        let found = bases.iter().copied().find(|&base| {
            tracking.contains_unmatched_base(base) && tracking.base(base).rule_key() == rule_key
        });
        if let Some(base) = found {
            tracking.match_pair(raw, base);
            matched += 1;
        }
    }
    matched
}

/// Length of the longest run of equal line hashes passing through `line_a`
/// and `line_b` as corresponding lines; 0 when the anchors differ.
#[must_use]
pub fn length_of_maximal_block(
    a: &LineHashSequence,
    line_a: u32,
    b: &LineHashSequence,
    line_b: u32,
) -> usize {
    let same = |i: u32, j: u32| {
        a.has_line(i) && b.has_line(j) && a.hash_for_line(i) == b.hash_for_line(j)
    };

    let mut length = 0_usize;
    let (mut i, mut j) = (line_a, line_b);
    while same(i, j) {
        length += 1;
        i += 1;
        j += 1;
    }
    let (mut i, mut j) = (line_a, line_b);
    while same(i, j) {
        length += 1;
        i -= 1;
        j -= 1;
    }
    length.saturating_sub(1)
}
