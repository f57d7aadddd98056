//! Mutable bipartite matching state of one tracking run.
//!
//! Trackables are referred to by their position in their [`Input`], never by
//! value: two field-for-field identical findings are still two findings.
//!
//! Invariants:
//! - every raw is either matched or in the unmatched-raw set;
//! - every base in the candidate pool is either the target of exactly one
//!   raw or in the unmatched-base set;
//! - matches are never undone within a run.

use std::collections::{BTreeMap, BTreeSet};

use ftrack_error::{Result, TrackError};
use ftrack_types::Trackable;
use tracing::warn;

use crate::input::Input;

/// Position of a raw trackable in its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawId(usize);

impl RawId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Position of a base trackable in its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaseId(usize);

impl BaseId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct Tracking<'a, R, B> {
    raw: &'a Input<R>,
    base: &'a Input<B>,
    raw_to_base: BTreeMap<RawId, BaseId>,
    base_to_raw: BTreeMap<BaseId, RawId>,
    unmatched_raws: BTreeSet<RawId>,
    unmatched_bases: BTreeSet<BaseId>,
    open_manual_issues_by_line: BTreeMap<u32, Vec<BaseId>>,
}

impl<'a, R: Trackable, B: Trackable> Tracking<'a, R, B> {
    /// Start a run where every base is a candidate.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::LineOutOfRange`] when a raw trackable declares a
    /// line its file does not have, and [`TrackError::LineSource`] when the
    /// raw lines cannot be read.
    pub fn new(raw: &'a Input<R>, base: &'a Input<B>) -> Result<Self> {
        Self::with_base_pool(raw, base, |_| true)
    }

    /// Start a run where only bases accepted by `in_pool` are candidates.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn with_base_pool(
        raw: &'a Input<R>,
        base: &'a Input<B>,
        in_pool: impl Fn(&B) -> bool,
    ) -> Result<Self> {
        validate_raw_lines(raw)?;
        let unmatched_raws = (0..raw.len()).map(RawId::new).collect();
        let unmatched_bases = base
            .trackables()
            .iter()
            .enumerate()
            .filter(|(_, trackable)| in_pool(*trackable))
            .map(|(idx, _)| BaseId::new(idx))
            .collect();
        Ok(Self {
            raw,
            base,
            raw_to_base: BTreeMap::new(),
            base_to_raw: BTreeMap::new(),
            unmatched_raws,
            unmatched_bases,
            open_manual_issues_by_line: BTreeMap::new(),
        })
    }
}

fn validate_raw_lines<R: Trackable>(raw: &Input<R>) -> Result<()> {
    let mut lines = raw.trackables().iter().filter_map(Trackable::line).peekable();
    if lines.peek().is_none() {
        return Ok(());
    }
    let sequence = raw.line_hash_sequence()?;
    for line in lines {
        if !sequence.has_line(line) {
            warn!(
                line,
                length = sequence.len(),
                "rejecting tracking run: raw trackable outside its file"
            );
            return Err(TrackError::LineOutOfRange {
                line,
                length: sequence.len(),
            });
        }
    }
    Ok(())
}

impl<'a, R, B> Tracking<'a, R, B> {
    #[must_use]
    pub fn raw_input(&self) -> &'a Input<R> {
        self.raw
    }

    #[must_use]
    pub fn base_input(&self) -> &'a Input<B> {
        self.base
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued for this run's raw input.
    #[must_use]
    pub fn raw(&self, id: RawId) -> &'a R {
        &self.raw.trackables()[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued for this run's base input.
    #[must_use]
    pub fn base(&self, id: BaseId) -> &'a B {
        &self.base.trackables()[id.0]
    }

    /// Unmatched raws in input order.
    pub fn unmatched_raws(&self) -> impl Iterator<Item = RawId> + '_ {
        self.unmatched_raws.iter().copied()
    }

    /// Unmatched candidate bases in input order.
    pub fn unmatched_bases(&self) -> impl Iterator<Item = BaseId> + '_ {
        self.unmatched_bases.iter().copied()
    }

    #[must_use]
    pub fn unmatched_raw_count(&self) -> usize {
        self.unmatched_raws.len()
    }

    #[must_use]
    pub fn unmatched_base_count(&self) -> usize {
        self.unmatched_bases.len()
    }

    #[must_use]
    pub fn contains_unmatched_raw(&self, id: RawId) -> bool {
        self.unmatched_raws.contains(&id)
    }

    #[must_use]
    pub fn contains_unmatched_base(&self, id: BaseId) -> bool {
        self.unmatched_bases.contains(&id)
    }

    #[must_use]
    pub fn base_for(&self, raw: RawId) -> Option<BaseId> {
        self.raw_to_base.get(&raw).copied()
    }

    #[must_use]
    pub fn raw_for(&self, base: BaseId) -> Option<RawId> {
        self.base_to_raw.get(&base).copied()
    }

    /// Matched pairs in raw input order.
    pub fn matched(&self) -> impl Iterator<Item = (RawId, BaseId)> + '_ {
        self.raw_to_base.iter().map(|(raw, base)| (*raw, *base))
    }

    #[must_use]
    pub fn match_count(&self) -> usize {
        self.raw_to_base.len()
    }

    /// No further pass can match anything.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unmatched_raws.is_empty() || self.unmatched_bases.is_empty()
    }

    /// Record `raw -> base`. Both must still be unmatched.
    pub(crate) fn match_pair(&mut self, raw: RawId, base: BaseId) {
        debug_assert!(self.unmatched_raws.contains(&raw), "raw {raw:?} already matched");
        debug_assert!(self.unmatched_bases.contains(&base), "base {base:?} not a candidate");
        self.unmatched_raws.remove(&raw);
        self.unmatched_bases.remove(&base);
        self.raw_to_base.insert(raw, base);
        self.base_to_raw.insert(base, raw);
    }

    /// Swap the candidate pool for `pool`; returns the bases left unmatched
    /// in the previous pool.
    pub(crate) fn replace_base_pool(&mut self, pool: BTreeSet<BaseId>) -> BTreeSet<BaseId> {
        std::mem::replace(&mut self.unmatched_bases, pool)
    }

    /// Put bases parked by [`Self::replace_base_pool`] back as unmatched.
    pub(crate) fn restore_bases(&mut self, parked: BTreeSet<BaseId>) {
        self.unmatched_bases.extend(parked);
    }

    /// Keep an unmatched manual base open at `line`: it leaves the unmatched
    /// pool and is indexed by line. Returns `false` if `base` is not an
    /// unmatched candidate.
    pub fn keep_manual_issue_open(&mut self, base: BaseId, line: u32) -> bool {
        if !self.unmatched_bases.remove(&base) {
            return false;
        }
        self.open_manual_issues_by_line
            .entry(line)
            .or_default()
            .push(base);
        true
    }

    #[must_use]
    pub fn open_manual_issues_by_line(&self) -> &BTreeMap<u32, Vec<BaseId>> {
        &self.open_manual_issues_by_line
    }
}
