//! Error types for the trainer core and its collaborators.
//!
//! Only conditions a caller can act on are errors. A clamped pace, a
//! duplicate answer and a stale timer callback are absorbed where they
//! happen and only show up in the logs.

use thiserror::Error;

/// Failures surfaced by the session state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The level list was empty, or every level in it was malformed.
    #[error("no levels available to start a session")]
    NoLevelsAvailable,
}

/// Failures while loading level content.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level pack not found: {0}")]
    PackNotFound(String),

    #[error("level pack {0} is not valid UTF-8")]
    NotUtf8(String),

    #[error("unable to parse level pack: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unable to read level pack: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while delivering or storing a session summary.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("result storage failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("result export failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}
