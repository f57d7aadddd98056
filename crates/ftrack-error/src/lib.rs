//! Error types shared by every FrankenTrack crate.
//!
//! Only malformed input, a failing line provider, and bad configuration are
//! errors. A trackable that finds no counterpart is a normal outcome and is
//! reported through the unmatched sets of a tracking result.

use thiserror::Error;

/// Primary error type for tracking runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// A raw trackable points at a line its own file does not have.
    #[error("trackable line {line} is out of range (file has {length} lines)")]
    LineOutOfRange { line: u32, length: usize },

    /// The line-content provider failed while hashing a file version.
    #[error("line source failed: {detail}")]
    LineSource { detail: String },

    /// Tracker configuration is unreadable or invalid.
    #[error("invalid tracker configuration: {detail}")]
    Config { detail: String },

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrackError {
    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a line-source error.
    pub fn line_source(detail: impl Into<String>) -> Self {
        Self::LineSource {
            detail: detail.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Whether resubmitting corrected input can fix this error.
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::LineOutOfRange { .. } | Self::Config { .. })
    }
}

/// Result alias using `TrackError`.
pub type Result<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_out_of_range_message() {
        let err = TrackError::LineOutOfRange {
            line: 12,
            length: 10,
        };
        assert_eq!(
            err.to_string(),
            "trackable line 12 is out of range (file has 10 lines)"
        );
        assert!(err.is_input_error());
    }

    #[test]
    fn constructors() {
        assert!(matches!(
            TrackError::line_source("disk gone"),
            TrackError::LineSource { detail } if detail == "disk gone"
        ));
        assert!(TrackError::config("move_detection_pair_limit must be > 0").is_input_error());
        assert!(!TrackError::internal("oops").is_input_error());
        assert!(!TrackError::line_source("disk gone").is_input_error());
        assert_eq!(TrackError::internal("oops").to_string(), "internal error: oops");
    }
}
