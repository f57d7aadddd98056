//! Owned, general-purpose trackable.

use serde::{Deserialize, Serialize};

use crate::{RuleKey, Timestamp, Trackable};

/// A finding as produced by an analyzer or loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_key: RuleKey,
    pub line: Option<u32>,
    pub message: Option<String>,
    pub line_hash: Option<String>,
    pub cve_id: Option<String>,
    pub status: Option<String>,
    pub creation_date: Option<Timestamp>,
    pub update_date: Option<Timestamp>,
}

impl Finding {
    #[must_use]
    pub fn builder(rule_key: RuleKey) -> FindingBuilder {
        FindingBuilder::new(rule_key)
    }
}

impl Trackable for Finding {
    fn line(&self) -> Option<u32> {
        self.line
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn line_hash(&self) -> Option<&str> {
        self.line_hash.as_deref()
    }

    fn rule_key(&self) -> &RuleKey {
        &self.rule_key
    }

    fn cve_id(&self) -> Option<&str> {
        self.cve_id.as_deref()
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn creation_date(&self) -> Option<Timestamp> {
        self.creation_date
    }

    fn update_date(&self) -> Option<Timestamp> {
        self.update_date
    }
}

/// Builder for [`Finding`].
#[derive(Debug, Clone)]
pub struct FindingBuilder {
    finding: Finding,
}

impl FindingBuilder {
    #[must_use]
    pub fn new(rule_key: RuleKey) -> Self {
        Self {
            finding: Finding {
                rule_key,
                line: None,
                message: None,
                line_hash: None,
                cve_id: None,
                status: None,
                creation_date: None,
                update_date: None,
            },
        }
    }

    #[must_use]
    pub fn line(mut self, line: u32) -> Self {
        self.finding.line = Some(line);
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.finding.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn line_hash(mut self, line_hash: impl Into<String>) -> Self {
        self.finding.line_hash = Some(line_hash.into());
        self
    }

    #[must_use]
    pub fn cve_id(mut self, cve_id: impl Into<String>) -> Self {
        self.finding.cve_id = Some(cve_id.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.finding.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn creation_date(mut self, date: Timestamp) -> Self {
        self.finding.creation_date = Some(date);
        self
    }

    #[must_use]
    pub fn update_date(mut self, date: Timestamp) -> Self {
        self.finding.update_date = Some(date);
        self
    }

    #[must_use]
    pub fn build(self) -> Finding {
        self.finding
    }
}
