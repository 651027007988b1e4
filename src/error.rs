//! Error types shared by the command core and its configuration layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::selection::{Position, Range};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by the host surface or raised while preparing a request for it.
///
/// The core never retries: these bubble up to the dispatcher unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The host refused to apply an edit batch.
    #[error("edit rejected: {0}")]
    EditRejected(String),

    /// A range references a position the document does not contain.
    #[error("invalid range {range:?} (document has {line_count} lines)")]
    InvalidRange {
        /// The offending range.
        range: Range,
        /// Line count at the time of the request.
        line_count: usize,
    },

    /// Two edits of one batch overlap.
    #[error("overlapping edits at {0:?}")]
    OverlappingEdits(Position),

    /// A named host command failed.
    #[error("command `{command}` failed: {reason}")]
    CommandFailed {
        /// Host command id.
        command: String,
        /// Host supplied reason.
        reason: String,
    },

    /// Arguments attached to a dispatched command could not be decoded.
    #[error("invalid arguments for `{command}`: {reason}")]
    InvalidArguments {
        /// Command name as dispatched.
        command: String,
        /// Decoder message.
        reason: String,
    },
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading a configuration file.
    #[error("I/O error reading {path}: {error}")]
    Io {
        /// Path to the file that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        error: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of its allowed domain.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
