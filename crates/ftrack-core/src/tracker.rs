//! Orchestrators: which passes run, in which order, over which base pool.
//!
//! | Tracker | Passes |
//! |---------|--------|
//! | [`Tracker`] | line+hash+message, line+hash, block moves, hash+message, line+message, hash only over non-closed bases; then line+hash+message over closed bases |
//! | [`SimpleTracker`] | line+hash, hash+message |
//! | [`AnticipatedTransitionTracker`] | the five fingerprint passes, no move detection, no closed pool |
//!
//! Passes stop as soon as tracking is complete; a skipped pass is not
//! reported.

use std::collections::{BTreeMap, BTreeSet};

use ftrack_error::Result;
use ftrack_types::Trackable;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::block_recognizer::BlockRecognizer;
use crate::config::TrackerConfig;
use crate::input::Input;
use crate::key::KeyKind;
use crate::matcher::match_by_key;
use crate::tracking::{BaseId, RawId, Tracking};

/// One step of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Fingerprint pass over the current candidate pool.
    Key(KeyKind),
    /// Block-move recognition.
    BlockMove,
    /// Fingerprint pass over the closed base pool.
    ClosedKey(KeyKind),
}

/// A pass that actually ran and how many pairs it added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOutcome {
    pub kind: PassKind,
    pub matched: usize,
}

const FULL_NON_CLOSED_PASSES: [PassKind; 6] = [
    PassKind::Key(KeyKind::LineHashMessage),
    PassKind::Key(KeyKind::LineHash),
    PassKind::BlockMove,
    PassKind::Key(KeyKind::HashMessage),
    PassKind::Key(KeyKind::LineMessage),
    PassKind::Key(KeyKind::HashOnly),
];

const CLOSED_PASS: KeyKind = KeyKind::LineHashMessage;

const SIMPLE_PASSES: [PassKind; 2] = [
    PassKind::Key(KeyKind::LineHash),
    PassKind::Key(KeyKind::HashMessage),
];

const ANTICIPATED_TRANSITION_PASSES: [PassKind; 5] = [
    PassKind::Key(KeyKind::LineHashMessage),
    PassKind::Key(KeyKind::LineHash),
    PassKind::Key(KeyKind::HashMessage),
    PassKind::Key(KeyKind::LineMessage),
    PassKind::Key(KeyKind::HashOnly),
];

fn run_passes<R: Trackable, B: Trackable>(
    tracking: &mut Tracking<'_, R, B>,
    steps: &[PassKind],
    recognizer: &BlockRecognizer,
    passes: &mut Vec<PassOutcome>,
) -> Result<()> {
    for &kind in steps {
        if tracking.is_complete() {
            break;
        }
        let matched = match kind {
            PassKind::Key(key) | PassKind::ClosedKey(key) => match_by_key(tracking, key),
            PassKind::BlockMove => match recognizer.match_moves(tracking) {
                Ok(report) => report.total(),
                Err(err) => {
                    warn!(
                        error = %err,
                        input_error = err.is_input_error(),
                        "move detection aborted the run"
                    );
                    return Err(err);
                }
            },
        };
        passes.push(PassOutcome { kind, matched });
    }
    Ok(())
}

fn finish<'a, R, B>(
    tracker: &'static str,
    tracking: Tracking<'a, R, B>,
    passes: Vec<PassOutcome>,
) -> TrackingResult<'a, R, B> {
    info!(
        tracker,
        passes = passes.len(),
        matched = tracking.match_count(),
        unmatched_raws = tracking.unmatched_raw_count(),
        unmatched_bases = tracking.unmatched_base_count(),
        "tracking run complete"
    );
    TrackingResult { tracking, passes }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Final, read-only outcome of a tracking run.
///
/// The only mutation left to the caller is
/// [`TrackingResult::keep_manual_issue_open`], which never touches matches.
#[derive(Debug)]
pub struct TrackingResult<'a, R, B> {
    tracking: Tracking<'a, R, B>,
    passes: Vec<PassOutcome>,
}

impl<'a, R, B> TrackingResult<'a, R, B> {
    #[must_use]
    pub fn tracking(&self) -> &Tracking<'a, R, B> {
        &self.tracking
    }

    /// Passes that ran, in order.
    #[must_use]
    pub fn passes(&self) -> &[PassOutcome] {
        &self.passes
    }

    /// # Panics
    ///
    /// Panics if `id` comes from another run; see [`Tracking::raw`].
    #[must_use]
    pub fn raw(&self, id: RawId) -> &'a R {
        self.tracking.raw(id)
    }

    /// # Panics
    ///
    /// Panics if `id` comes from another run; see [`Tracking::base`].
    #[must_use]
    pub fn base(&self, id: BaseId) -> &'a B {
        self.tracking.base(id)
    }

    #[must_use]
    pub fn base_for(&self, raw: RawId) -> Option<BaseId> {
        self.tracking.base_for(raw)
    }

    #[must_use]
    pub fn raw_for(&self, base: BaseId) -> Option<RawId> {
        self.tracking.raw_for(base)
    }

    pub fn matched(&self) -> impl Iterator<Item = (RawId, BaseId)> + '_ {
        self.tracking.matched()
    }

    #[must_use]
    pub fn match_count(&self) -> usize {
        self.tracking.match_count()
    }

    /// Raws without a base: new trackables.
    pub fn unmatched_raws(&self) -> impl Iterator<Item = RawId> + '_ {
        self.tracking.unmatched_raws()
    }

    /// Bases without a raw, closed and non-closed alike.
    pub fn unmatched_bases(&self) -> impl Iterator<Item = BaseId> + '_ {
        self.tracking.unmatched_bases()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.tracking.is_complete()
    }

    pub fn keep_manual_issue_open(&mut self, base: BaseId, line: u32) -> bool {
        self.tracking.keep_manual_issue_open(base, line)
    }

    #[must_use]
    pub fn open_manual_issues_by_line(&self) -> &BTreeMap<u32, Vec<BaseId>> {
        self.tracking.open_manual_issues_by_line()
    }
}

// ---------------------------------------------------------------------------
// Full tracker
// ---------------------------------------------------------------------------

/// Tracking after the non-closed stage of [`Tracker`]; closed bases are
/// parked until [`Tracker::track_closed`].
#[derive(Debug)]
pub struct NonClosedTracking<'a, R, B> {
    tracking: Tracking<'a, R, B>,
    closed: BTreeSet<BaseId>,
    passes: Vec<PassOutcome>,
}

impl<'a, R, B> NonClosedTracking<'a, R, B> {
    #[must_use]
    pub fn tracking(&self) -> &Tracking<'a, R, B> {
        &self.tracking
    }

    /// Closed bases, all still unmatched.
    pub fn closed_bases(&self) -> impl Iterator<Item = BaseId> + '_ {
        self.closed.iter().copied()
    }

    #[must_use]
    pub fn passes(&self) -> &[PassOutcome] {
        &self.passes
    }
}

/// Five fingerprint heuristics plus move detection, with a separate closed pool.
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    config: TrackerConfig,
}

impl Tracker {
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Track with bases whose status equals the configured closed status in
    /// the closed pool.
    ///
    /// # Errors
    ///
    /// See [`Tracking::new`].
    pub fn track<'a, R: Trackable, B: Trackable>(
        &self,
        raw: &'a Input<R>,
        base: &'a Input<B>,
    ) -> Result<TrackingResult<'a, R, B>> {
        let closed_status = self.config.closed_status.as_str();
        self.track_with(raw, base, |b: &B| b.status() == Some(closed_status))
    }

    /// Track with a caller-defined closed predicate.
    ///
    /// # Errors
    ///
    /// See [`Tracking::new`].
    pub fn track_with<'a, R: Trackable, B: Trackable>(
        &self,
        raw: &'a Input<R>,
        base: &'a Input<B>,
        is_closed: impl Fn(&B) -> bool,
    ) -> Result<TrackingResult<'a, R, B>> {
        let non_closed = self.track_non_closed(raw, base, is_closed)?;
        Ok(self.track_closed(non_closed))
    }

    /// Run every pass against the non-closed bases.
    ///
    /// # Errors
    ///
    /// See [`Tracking::new`]; also fails when lines cannot be read for move
    /// detection.
    pub fn track_non_closed<'a, R: Trackable, B: Trackable>(
        &self,
        raw: &'a Input<R>,
        base: &'a Input<B>,
        is_closed: impl Fn(&B) -> bool,
    ) -> Result<NonClosedTracking<'a, R, B>> {
        let mut tracking = Tracking::with_base_pool(raw, base, |b| !is_closed(b))?;
        let closed = base
            .trackables()
            .iter()
            .enumerate()
            .filter(|(_, b)| is_closed(*b))
            .map(|(idx, _)| BaseId::new(idx))
            .collect();

        let recognizer = BlockRecognizer::new(self.config.move_detection_pair_limit);
        let mut passes = Vec::new();
        run_passes(&mut tracking, &FULL_NON_CLOSED_PASSES, &recognizer, &mut passes)?;
        Ok(NonClosedTracking {
            tracking,
            closed,
            passes,
        })
    }

    /// Match remaining raws against closed bases, then merge both pools.
    #[must_use]
    pub fn track_closed<'a, R: Trackable, B: Trackable>(
        &self,
        non_closed: NonClosedTracking<'a, R, B>,
    ) -> TrackingResult<'a, R, B> {
        let NonClosedTracking {
            mut tracking,
            closed,
            mut passes,
        } = non_closed;

        let remaining_non_closed = tracking.replace_base_pool(closed);
        if !tracking.is_complete() {
            let matched = match_by_key(&mut tracking, CLOSED_PASS);
            passes.push(PassOutcome {
                kind: PassKind::ClosedKey(CLOSED_PASS),
                matched,
            });
        }
        tracking.restore_bases(remaining_non_closed);
        finish("full", tracking, passes)
    }
}

// ---------------------------------------------------------------------------
// Cheaper variants
// ---------------------------------------------------------------------------

/// Two fingerprint passes, no move detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTracker;

impl SimpleTracker {
    /// # Errors
    ///
    /// See [`Tracking::new`].
    pub fn track<'a, R: Trackable, B: Trackable>(
        &self,
        raw: &'a Input<R>,
        base: &'a Input<B>,
    ) -> Result<TrackingResult<'a, R, B>> {
        let mut tracking = Tracking::new(raw, base)?;
        let mut passes = Vec::new();
        run_passes(
            &mut tracking,
            &SIMPLE_PASSES,
            &BlockRecognizer::default(),
            &mut passes,
        )?;
        Ok(finish("simple", tracking, passes))
    }
}

/// Five fingerprint passes over all bases, for issues whose transition was
/// anticipated elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnticipatedTransitionTracker;

impl AnticipatedTransitionTracker {
    /// # Errors
    ///
    /// See [`Tracking::new`].
    pub fn track<'a, R: Trackable, B: Trackable>(
        &self,
        raw: &'a Input<R>,
        base: &'a Input<B>,
    ) -> Result<TrackingResult<'a, R, B>> {
        let mut tracking = Tracking::new(raw, base)?;
        let mut passes = Vec::new();
        run_passes(
            &mut tracking,
            &ANTICIPATED_TRANSITION_PASSES,
            &BlockRecognizer::default(),
            &mut passes,
        )?;
        Ok(finish("anticipated_transition", tracking, passes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftrack_types::{Finding, RuleKey};

    fn text() -> Vec<String> {
        (0..30).map(|i| format!("line {i}")).collect()
    }

    fn issue(line: u32, hash: &str, message: &str) -> Finding {
        Finding::builder(RuleKey::new("java", "R1"))
            .line(line)
            .line_hash(hash)
            .message(message)
            .status("OPEN")
            .build()
    }

    fn closed(finding: Finding) -> Finding {
        Finding {
            status: Some("CLOSED".to_owned()),
            ..finding
        }
    }

    #[test]
    fn full_tracker_pass_order() {
        let raw = Input::from_lines(vec![issue(1, "a", "m"), issue(2, "zz", "n")], text());
        let base = Input::from_lines(vec![issue(1, "a", "m"), issue(9, "yy", "other")], text());
        let result = Tracker::default().track(&raw, &base).expect("valid");
        let kinds: Vec<PassKind> = result.passes().iter().map(|p| p.kind).collect();
        assert_eq!(kinds[..FULL_NON_CLOSED_PASSES.len()], FULL_NON_CLOSED_PASSES);
        // Closed pool is empty, so the closed pass is skipped.
        assert_eq!(kinds.len(), FULL_NON_CLOSED_PASSES.len());
        assert_eq!(result.passes()[0].matched, 1);
        assert_eq!(result.match_count(), 1);
    }

    #[test]
    fn stops_once_complete() {
        let raw = Input::from_lines(vec![issue(3, "a", "m")], text());
        let base = Input::from_lines(vec![issue(3, "a", "m"), issue(4, "b", "m")], text());
        let result = AnticipatedTransitionTracker.track(&raw, &base).expect("valid");
        assert_eq!(
            result.passes(),
            &[PassOutcome {
                kind: PassKind::Key(KeyKind::LineHashMessage),
                matched: 1
            }]
        );
        assert!(result.is_complete());
        assert_eq!(result.unmatched_bases().map(BaseId::index).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn closed_bases_only_meet_the_strictest_pass() {
        let raw = Input::from_lines(vec![issue(5, "h1", "new message")], text());
        let base = Input::from_lines(vec![closed(issue(5, "h1", "old message"))], text());
        let result = Tracker::default().track(&raw, &base).expect("valid");
        assert_eq!(result.match_count(), 0);
        assert_eq!(result.unmatched_bases().count(), 1);
        assert_eq!(
            result.passes().last().map(|p| p.kind),
            Some(PassKind::ClosedKey(KeyKind::LineHashMessage))
        );
    }

    #[test]
    fn non_closed_preferred_over_closed() {
        let raw = Input::from_lines(vec![issue(5, "h1", "m")], text());
        let base = Input::from_lines(
            vec![closed(issue(5, "h1", "m")), issue(5, "h1", "m")],
            text(),
        );
        let result = Tracker::default().track(&raw, &base).expect("valid");
        assert_eq!(
            result.matched().map(|(r, b)| (r.index(), b.index())).collect::<Vec<_>>(),
            vec![(0, 1)]
        );
        assert_eq!(result.unmatched_bases().map(BaseId::index).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn split_stages_and_custom_predicate() {
        let raw = Input::from_lines(vec![issue(5, "h1", "m"), issue(6, "h2", "m")], text());
        let resolved = Finding {
            status: Some("RESOLVED".to_owned()),
            ..issue(6, "h2", "m")
        };
        let base = Input::from_lines(vec![resolved, issue(20, "other", "x")], text());
        let tracker = Tracker::default();
        let non_closed = tracker
            .track_non_closed(&raw, &base, |b: &Finding| b.status.as_deref() == Some("RESOLVED"))
            .expect("valid");
        assert_eq!(non_closed.closed_bases().map(BaseId::index).collect::<Vec<_>>(), vec![0]);
        assert_eq!(non_closed.tracking().match_count(), 0);
        assert!(!non_closed.passes().is_empty());

        let result = tracker.track_closed(non_closed);
        let raw_id = result.raw_for(BaseId::new(0)).expect("matched");
        assert_eq!(result.base_for(raw_id), Some(BaseId::new(0)));
        assert_eq!(result.raw(RawId::new(1)).line, Some(6));
        assert_eq!(result.unmatched_bases().map(BaseId::index).collect::<Vec<_>>(), vec![1]);
        assert_eq!(result.unmatched_raws().map(RawId::index).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn configured_closed_status() {
        let config = TrackerConfig {
            closed_status: "DONE".to_owned(),
            ..TrackerConfig::default()
        };
        let raw = Input::from_lines(vec![issue(5, "h1", "new")], text());
        let done = Finding {
            status: Some("DONE".to_owned()),
            ..issue(5, "h1", "old")
        };
        let base = Input::from_lines(vec![done], text());
        // With DONE closed, Line+Hash cannot reach it.
        assert_eq!(Tracker::new(config).track(&raw, &base).expect("valid").match_count(), 0);
        // Under the default CLOSED status it is an ordinary base.
        assert_eq!(Tracker::default().track(&raw, &base).expect("valid").match_count(), 1);
    }

    #[test]
    fn simple_tracker_two_passes() {
        let raw = Input::from_lines(
            vec![issue(5, "h1", "m"), issue(30, "h2", "moved"), issue(7, "h3", "edited")],
            text(),
        );
        let base = Input::from_lines(
            vec![issue(5, "h1", "x"), issue(2, "h2", "moved"), issue(7, "h4", "edited")],
            text(),
        );
        let result = SimpleTracker.track(&raw, &base).expect("valid");
        let kinds: Vec<PassKind> = result.passes().iter().map(|p| p.kind).collect();
        assert_eq!(kinds, SIMPLE_PASSES.to_vec());
        assert_eq!(result.match_count(), 2);
        // Line+Message would have caught the edit; the simple tracker does not run it.
        assert_eq!(result.unmatched_raws().map(RawId::index).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn manual_issue_bookkeeping_on_result() {
        let raw = Input::from_lines(vec![issue(1, "a", "m")], text());
        let manual = Finding::builder(RuleKey::new("manual", "note"))
            .line(4)
            .status("OPEN")
            .build();
        let base = Input::from_lines(vec![manual], text());
        let mut result = Tracker::default().track(&raw, &base).expect("valid");
        let manual_id = result.unmatched_bases().next().expect("manual base unmatched");
        assert!(result.base(manual_id).rule_key.is_manual());
        assert!(result.keep_manual_issue_open(manual_id, 4));
        assert_eq!(result.open_manual_issues_by_line().get(&4), Some(&vec![manual_id]));
        assert_eq!(result.unmatched_bases().count(), 0);
    }

    #[test]
    fn pass_report_is_serializable() {
        let passes = [
            PassOutcome {
                kind: PassKind::Key(KeyKind::LineHashMessage),
                matched: 1,
            },
            PassOutcome {
                kind: PassKind::BlockMove,
                matched: 0,
            },
        ];
        let json = serde_json::to_string(&passes).expect("serialize");
        assert_eq!(
            json,
            r#"[{"kind":{"key":"line_hash_message"},"matched":1},{"kind":"block_move","matched":0}]"#
        );
        let back: Vec<PassOutcome> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, passes);
    }
}
