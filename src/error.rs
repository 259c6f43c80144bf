//! Error types for the matching engine
//!
//! Bad input never reaches this enum: every scoring function degrades to a
//! neutral value instead. The only runtime failure an operation can report
//! is a classifier call that outlives its deadline.

use thiserror::Error;

/// Errors surfaced by the matching engine
#[derive(Debug, Error)]
pub enum MatchError {
    /// The classifier did not answer before the configured deadline
    #[error("classifier call timed out after {timeout_ms}ms")]
    ClassifierTimeout { timeout_ms: u64 },

    /// Configuration could not be read or parsed
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl MatchError {
    /// Whether this error is a cancellation rather than a real failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, MatchError::ClassifierTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
