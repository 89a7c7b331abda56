//! Error types for ftx-campaign
//!
//! Three families surface to whatever loop drives `step()`:
//! - precondition/state errors (`InvalidState`, `NotLoaded`, `AlreadyExists`)
//! - filesystem errors (`MissingFile`, `Io`, `Walk`)
//! - log-parsing errors (`MarkerNotFound`, `LineOutOfRange`, `MalformedToken`)
//!
//! None of them are retried. A restart that hits any of them is abandoned.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ftx-campaign error types
#[derive(Error, Debug)]
pub enum Error {
    /// Operation not allowed in the current orchestrator state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Derived output queried before it was loaded
    #[error("No {0} data found, call load_{0}() first")]
    NotLoaded(&'static str),

    /// Protected output already present
    #[error("File {} already exists, use overwrite=true to replace it", .0.display())]
    AlreadyExists(PathBuf),

    /// Expected input file is absent
    #[error("File {} does not exist", .0.display())]
    MissingFile(PathBuf),

    /// Log marker never reported by the terminated attempt
    #[error("Log parse error: marker {marker:?} not found")]
    MarkerNotFound {
        /// Literal marker searched for
        marker: &'static str,
    },

    /// Offset from a marker line runs past the end of the log
    #[error("Log parse error: line {line} (relative to marker {marker:?}) is past the end of the log")]
    LineOutOfRange {
        /// Marker the offset is relative to
        marker: &'static str,
        /// Absolute line index that was requested
        line: usize,
    },

    /// Token missing or not numeric
    #[error("Log parse error near marker {marker:?}: token {token:?} {reason}")]
    MalformedToken {
        /// Marker the token belongs to
        marker: &'static str,
        /// Offending token (empty if missing)
        token: String,
        /// What went wrong
        reason: String,
    },

    /// Attempt parameter store lacks a required key
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// Checkpoint truncation service failed
    #[error("Checkpoint truncation failed: {0}")]
    Truncation(String),

    /// Malformed numeric table (time-series output)
    #[error("Table parse error in {}: {reason}", path.display())]
    Table {
        /// Table file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
