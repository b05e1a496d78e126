//! Error types for perf-checkpoint
//!
//! Only a few paths surface errors to callers: persistence, record parsing
//! and the rejecting duplicate-checkpoint policy. Everything on the timing
//! hot path degrades to logging instead.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// perf-checkpoint error types
#[derive(Error, Debug)]
pub enum Error {
    /// A checkpoint name was recorded twice under `DuplicatePolicy::Reject`
    #[error("Duplicate checkpoint '{name}' in run '{run}'\nUse a unique name per checkpoint or switch the duplicate policy")]
    DuplicateCheckpoint {
        /// Run that already holds the checkpoint
        run: String,
        /// Offending checkpoint name
        name: String,
    },

    /// Record filename pattern did not compile
    #[error("Invalid record pattern: {0}")]
    InvalidPattern(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
