//! Issue identity tracking across analyses.
//!
//! Given the trackables of a fresh analysis (raw) and the stored trackables
//! of the previous one (base) for the same file, decide which raw
//! corresponds to which base so history survives edits, insertions and
//! relocated blocks.
//!
//! Flow:
//! 1. wrap each side in an [`Input`] (trackables + lazily hashed lines),
//! 2. hand both to one of the orchestrators ([`Tracker`], [`SimpleTracker`],
//!    [`AnticipatedTransitionTracker`]),
//! 3. read the [`TrackingResult`]: matched pairs, unmatched raws (new),
//!    unmatched bases (gone).
//!
//! A run is synchronous and single threaded. Independent runs may execute
//! in parallel and may share [`Input`]s; the lazy hash caches are safe for
//! concurrent first use.

pub mod block_recognizer;
pub mod config;
pub mod input;
pub mod key;
pub mod matcher;
pub mod tracker;
pub mod tracking;

pub use block_recognizer::{BlockRecognizer, MoveReport, length_of_maximal_block};
pub use config::{DEFAULT_CLOSED_STATUS, DEFAULT_MOVE_DETECTION_PAIR_LIMIT, TrackerConfig};
pub use ftrack_error::{Result, TrackError};
pub use ftrack_hash::{BlockHashSequence, LineHashSequence};
pub use ftrack_types::{Finding, RuleKey, Timestamp, Trackable};
pub use input::{Input, LineSource};
pub use key::{FingerprintKey, KeyKind};
pub use matcher::match_by_key;
pub use tracker::{
    AnticipatedTransitionTracker, NonClosedTracking, PassKind, PassOutcome, SimpleTracker,
    Tracker, TrackingResult,
};
pub use tracking::{BaseId, RawId, Tracking};
