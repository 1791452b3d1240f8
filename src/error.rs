//! Error types for texpipe
//!
//! Only fatal conditions live here. Anything a tool can recover from on a
//! later pass (nonzero exit, stale target, a warning in a log) is reported
//! through the log sink instead.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal build failures
#[derive(Debug, Error)]
pub enum BuildError {
    /// The external program could not be started at all
    #[error("Error running {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program exceeded its configured timeout
    #[error("Running {command} timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// A required directory is missing
    #[error("Directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    /// A path expected to be a directory is something else
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The output directory for a document could not be created
    #[error("Cannot create target directory {path}: {source}")]
    TargetDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured regular expression does not compile
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Settings failed validation
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for texpipe operations
pub type Result<T> = std::result::Result<T, BuildError>;
