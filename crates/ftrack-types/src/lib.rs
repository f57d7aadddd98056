//! Core type definitions for FrankenTrack.
//!
//! A trackable is anything produced by an analysis that must keep its
//! identity from one analysis to the next: a rule violation, a duplicated
//! block, a security hotspot. The tracking engine only ever looks at the
//! handful of fields exposed by [`Trackable`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod finding;

pub use finding::{Finding, FindingBuilder};

/// Repository name reserved for findings created by hand instead of by a rule.
pub const MANUAL_REPOSITORY: &str = "manual";

/// Identifier of the rule that produced a trackable: `repository:rule`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleKey {
    repository: String,
    rule: String,
}

impl RuleKey {
    #[must_use]
    pub fn new(repository: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            rule: rule.into(),
        }
    }

    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Whether the key designates a manually created finding.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.repository == MANUAL_REPOSITORY
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.rule)
    }
}

/// Error returned when a rule key string lacks the `repository:rule` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRuleKeyError(String);

impl fmt::Display for ParseRuleKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid rule key '{}', expected repository:rule", self.0)
    }
}

impl std::error::Error for ParseRuleKeyError {}

impl FromStr for RuleKey {
    type Err = ParseRuleKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((repository, rule)) if !repository.is_empty() && !rule.is_empty() => {
                Ok(Self::new(repository, rule))
            }
            _ => Err(ParseRuleKeyError(s.to_owned())),
        }
    }
}

/// Milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

/// An entity whose identity is carried across two analyses.
///
/// Raw (fresh) and base (stored) trackables share this shape. Base
/// trackables usually also report [`Trackable::status`] and
/// [`Trackable::update_date`].
pub trait Trackable {
    /// 1-based line, or `None` for file-level findings.
    fn line(&self) -> Option<u32>;

    fn message(&self) -> Option<&str>;

    /// Content hash of the owning line when the trackable was created.
    fn line_hash(&self) -> Option<&str>;

    fn rule_key(&self) -> &RuleKey;

    fn cve_id(&self) -> Option<&str> {
        None
    }

    /// Lifecycle status such as `OPEN` or `CLOSED`.
    fn status(&self) -> Option<&str> {
        None
    }

    fn creation_date(&self) -> Option<Timestamp> {
        None
    }

    /// Last modification; the most recent base wins among equal fingerprints.
    fn update_date(&self) -> Option<Timestamp> {
        None
    }

    fn is_manual(&self) -> bool {
        self.rule_key().is_manual()
    }
}

impl<T: Trackable + ?Sized> Trackable for &T {
    fn line(&self) -> Option<u32> {
        (**self).line()
    }

    fn message(&self) -> Option<&str> {
        (**self).message()
    }

    fn line_hash(&self) -> Option<&str> {
        (**self).line_hash()
    }

    fn rule_key(&self) -> &RuleKey {
        (**self).rule_key()
    }

    fn cve_id(&self) -> Option<&str> {
        (**self).cve_id()
    }

    fn status(&self) -> Option<&str> {
        (**self).status()
    }

    fn creation_date(&self) -> Option<Timestamp> {
        (**self).creation_date()
    }

    fn update_date(&self) -> Option<Timestamp> {
        (**self).update_date()
    }

    fn is_manual(&self) -> bool {
        (**self).is_manual()
    }
}
