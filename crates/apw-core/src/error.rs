//! Error types for apw
//!
//! This module defines all error types used throughout the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for apw operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for apw
#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot source failed to produce a snapshot
    #[error("Snapshot source error: {0}")]
    Source(String),

    /// Snapshot source produced no records at all
    #[error("Snapshot source returned no packages; refusing to treat the whole catalog as removed")]
    EmptySnapshot,

    /// Two records in one snapshot share an identity key
    #[error("Duplicate package id in snapshot: {0}")]
    DuplicateKey(String),

    /// A record failed validation at the snapshot boundary
    #[error("Invalid package record: {0}")]
    InvalidRecord(String),

    /// Persisted state could not be read back
    #[error("State file {path} is corrupt: {message}. Run 'apw init' to re-initialize")]
    StateCorrupt {
        /// Path of the offending state file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Database invariant broken (programming or data-integrity bug)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a snapshot source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// Create a corrupt state error
    pub fn state_corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StateCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from the snapshot boundary
    ///
    /// Provider failures never mutate state, so callers may simply rerun later.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::Source(_) | Self::EmptySnapshot | Self::DuplicateKey(_) | Self::InvalidRecord(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_grouping() {
        assert!(Error::source("expac exited with 1").is_provider_failure());
        assert!(Error::EmptySnapshot.is_provider_failure());
        assert!(Error::DuplicateKey("core/foo".into()).is_provider_failure());
        assert!(!Error::invariant("missing core/foo").is_provider_failure());
        assert!(!Error::state_corrupt("/tmp/apw.json", "bad json").is_provider_failure());
    }

    #[test]
    fn test_state_corrupt_message_points_to_init() {
        let err = Error::state_corrupt("/tmp/apw.json", "expected value");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/apw.json"));
        assert!(msg.contains("apw init"));
    }
}
