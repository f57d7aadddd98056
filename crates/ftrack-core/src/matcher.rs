//! One fingerprint matching pass.

use std::cmp::Reverse;

use ftrack_types::Trackable;
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::key::{FingerprintKey, KeyKind};
use crate::tracking::{BaseId, RawId, Tracking};

/// Match unmatched raws to unmatched bases sharing the same `kind` key.
///
/// When several bases share a raw's key, the most recently updated one wins
/// (bases without an update date rank last); ties go to the earliest base in
/// input order. Raws are visited in input order. The chosen base leaves the
/// candidate list, the others stay available. Returns the number of new
/// matches; a second identical pass returns 0.
pub fn match_by_key<R: Trackable, B: Trackable>(
    tracking: &mut Tracking<'_, R, B>,
    kind: KeyKind,
) -> usize {
    if tracking.is_complete() {
        return 0;
    }

    let mut candidates: HashMap<FingerprintKey<'_>, SmallVec<[BaseId; 1]>> = HashMap::new();
    for id in tracking.unmatched_bases() {
        candidates
            .entry(kind.key_of(tracking.base(id)))
            .or_default()
            .push(id);
    }
    for bases in candidates.values_mut() {
        if bases.len() > 1 {
            bases.sort_by_key(|id| Reverse(tracking.base(*id).update_date()));
        }
    }

    let raws: Vec<RawId> = tracking.unmatched_raws().collect();
    let mut matched = 0_usize;
    for raw in raws {
        let key = kind.key_of(tracking.raw(raw));
        let Some(bases) = candidates.get_mut(&key) else {
            continue;
        };
        if bases.is_empty() {
            continue;
        }
        let base = bases.remove(0);
        tracking.match_pair(raw, base);
        matched += 1;
    }

    debug!(
        pass = ?kind,
        matched,
        unmatched_raws = tracking.unmatched_raw_count(),
        unmatched_bases = tracking.unmatched_base_count(),
        "fingerprint pass complete"
    );
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Input;
    use ftrack_types::{Finding, RuleKey, Timestamp};

    fn lines() -> Vec<String> {
        (0..20).map(|i| format!("line {i}")).collect()
    }

    fn issue(rule: &str, line: u32, hash: &str, message: &str) -> Finding {
        Finding::builder(RuleKey::new("java", rule))
            .line(line)
            .line_hash(hash)
            .message(message)
            .build()
    }

    fn updated(mut finding: Finding, millis: u64) -> Finding {
        finding.update_date = Some(Timestamp::from_millis(millis));
        finding
    }

    #[test]
    fn exact_match() {
        let raw = Input::from_lines(vec![issue("R1", 5, "h1", "m")], lines());
        let base = Input::from_lines(vec![issue("R1", 5, "h1", "m")], lines());
        let mut tracking = Tracking::new(&raw, &base).expect("valid");
        assert_eq!(match_by_key(&mut tracking, KeyKind::LineHashMessage), 1);
        let (raw_id, _) = tracking.matched().next().expect("pair");
        assert_eq!(tracking.base_for(raw_id).map(BaseId::index), Some(0));
    }

    #[test]
    fn rule_key_must_agree() {
        let raw = Input::from_lines(vec![issue("R1", 5, "h1", "m")], lines());
        let base = Input::from_lines(vec![issue("R2", 5, "h1", "m")], lines());
        let mut tracking = Tracking::new(&raw, &base).expect("valid");
        for kind in KeyKind::ALL {
            assert_eq!(match_by_key(&mut tracking, kind), 0, "{kind:?}");
        }
    }

    #[test]
    fn most_recently_updated_base_wins() {
        let raw = Input::from_lines(vec![issue("R1", 5, "h1", "m")], lines());
        let base = Input::from_lines(
            vec![
                updated(issue("R1", 5, "h1", "m"), 100),
                updated(issue("R1", 5, "h1", "m"), 300),
                updated(issue("R1", 5, "h1", "m"), 200),
            ],
            lines(),
        );
        let mut tracking = Tracking::new(&raw, &base).expect("valid");
        assert_eq!(match_by_key(&mut tracking, KeyKind::LineHashMessage), 1);
        let (_, base_id) = tracking.matched().next().expect("one pair");
        assert_eq!(base_id.index(), 1);
    }

    #[test]
    fn ties_and_missing_dates_resolve_by_input_order() {
        let raw = Input::from_lines(
            vec![issue("R1", 5, "h1", "m"), issue("R1", 5, "h1", "m")],
            lines(),
        );
        let base = Input::from_lines(
            vec![
                issue("R1", 5, "h1", "m"),
                updated(issue("R1", 5, "h1", "m"), 7),
                updated(issue("R1", 5, "h1", "m"), 7),
            ],
            lines(),
        );
        let mut tracking = Tracking::new(&raw, &base).expect("valid");
        assert_eq!(match_by_key(&mut tracking, KeyKind::LineHashMessage), 2);
        let pairs: Vec<(usize, usize)> = tracking
            .matched()
            .map(|(r, b)| (r.index(), b.index()))
            .collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
        assert_eq!(tracking.unmatched_bases().map(BaseId::index).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn second_run_is_idempotent() {
        let raw = Input::from_lines(
            vec![issue("R1", 5, "h1", "m"), issue("R1", 9, "h9", "x")],
            lines(),
        );
        let base = Input::from_lines(
            vec![issue("R1", 5, "h1", "m"), issue("R1", 9, "other", "y")],
            lines(),
        );
        let mut tracking = Tracking::new(&raw, &base).expect("valid");
        assert_eq!(match_by_key(&mut tracking, KeyKind::LineHash), 1);
        let before: Vec<_> = tracking.matched().collect();
        assert_eq!(match_by_key(&mut tracking, KeyKind::LineHash), 0);
        assert_eq!(tracking.matched().collect::<Vec<_>>(), before);
    }

    #[test]
    fn complete_tracking_is_untouched() {
        let raw = Input::from_lines(Vec::<Finding>::new(), lines());
        let base = Input::from_lines(vec![issue("R1", 5, "h1", "m")], lines());
        let mut tracking = Tracking::new(&raw, &base).expect("valid");
        assert!(tracking.is_complete());
        assert_eq!(match_by_key(&mut tracking, KeyKind::HashOnly), 0);
        assert_eq!(tracking.unmatched_base_count(), 1);
    }
}
