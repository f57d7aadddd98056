//! Tracker configuration.

use ftrack_error::{Result, TrackError};
use serde::{Deserialize, Serialize};

/// Above this many (base line, raw line) combinations the block-move
/// recognizer stops after its unique-hash pre-pass.
pub const DEFAULT_MOVE_DETECTION_PAIR_LIMIT: usize = 250_000;

/// Status value that puts a base trackable in the closed pool.
pub const DEFAULT_CLOSED_STATUS: &str = "CLOSED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub move_detection_pair_limit: usize,
    pub closed_status: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            move_detection_pair_limit: DEFAULT_MOVE_DETECTION_PAIR_LIMIT,
            closed_status: DEFAULT_CLOSED_STATUS.to_owned(),
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Config`] on malformed TOML, unknown keys, or
    /// values rejected by [`Self::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|err| TrackError::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`TrackError::Config`] for a zero pair limit or an empty
    /// closed status.
    pub fn validate(&self) -> Result<()> {
        if self.move_detection_pair_limit == 0 {
            return Err(TrackError::config("move_detection_pair_limit must be > 0"));
        }
        if self.closed_status.trim().is_empty() {
            return Err(TrackError::config("closed_status must not be empty"));
        }
        Ok(())
    }
}
