//! Fingerprint keys, from most to least specific.
//!
//! Every key includes the rule key and the CVE id, so trackables of
//! different rules never share a key. `line_hash` is normalized to the empty
//! string when absent; real line hashes are never empty.

use ftrack_types::{RuleKey, Trackable};
use serde::{Deserialize, Serialize};

/// Which fields participate in a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Same position, same content, same message.
    LineHashMessage,
    /// Same position and content; the message may have changed.
    LineHash,
    /// Same content and message; the line moved.
    HashMessage,
    /// Same position and message; the line was edited.
    LineMessage,
    /// Same content only. Last resort.
    HashOnly,
}

impl KeyKind {
    /// All kinds, most specific first.
    pub const ALL: [Self; 5] = [
        Self::LineHashMessage,
        Self::LineHash,
        Self::HashMessage,
        Self::LineMessage,
        Self::HashOnly,
    ];

    const fn uses_line(self) -> bool {
        matches!(self, Self::LineHashMessage | Self::LineHash | Self::LineMessage)
    }

    const fn uses_hash(self) -> bool {
        !matches!(self, Self::LineMessage)
    }

    const fn uses_message(self) -> bool {
        matches!(
            self,
            Self::LineHashMessage | Self::HashMessage | Self::LineMessage
        )
    }

    /// Fingerprint of `trackable` under this kind.
    #[must_use]
    pub fn key_of<'t, T: Trackable + ?Sized>(self, trackable: &'t T) -> FingerprintKey<'t> {
        FingerprintKey {
            rule_key: trackable.rule_key(),
            cve_id: trackable.cve_id(),
            line: if self.uses_line() {
                trackable.line()
            } else {
                None
            },
            line_hash: if self.uses_hash() {
                trackable.line_hash().unwrap_or("")
            } else {
                ""
            },
            message: if self.uses_message() {
                trackable.message()
            } else {
                None
            },
        }
    }
}

/// Equality key borrowed from a trackable. Fields the kind ignores are
/// blanked so that only the participating fields decide equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FingerprintKey<'t> {
    rule_key: &'t RuleKey,
    cve_id: Option<&'t str>,
    line: Option<u32>,
    line_hash: &'t str,
    message: Option<&'t str>,
}
