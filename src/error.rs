//! Error types for parquet-dl
//!
//! Two layers of failure exist:
//! - [`Error`] covers pipeline setup and run-level faults. These are fatal and end the run.
//! - [`FetchFailure`] covers a single download. It never escapes the task that produced it and
//!   is carried inside a [`DownloadResult`](crate::types::DownloadResult) instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for parquet-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for parquet-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// The manifest could not be opened or is not a Parquet file
    #[error("failed to open manifest {path}: {reason}")]
    Open {
        /// Path of the manifest that failed to open
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// The manifest lacks one or more required columns
    #[error("manifest {path} is missing required columns: {}", missing.join(", "))]
    Schema {
        /// Path of the manifest
        path: PathBuf,
        /// Names of the columns that were not found
        missing: Vec<String>,
    },

    /// A row group could not be decoded after the run had started
    #[error("failed reading row group {row_group}: {reason}")]
    Read {
        /// Index of the row group being decoded
        row_group: usize,
        /// Underlying cause
        reason: String,
    },

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Config`] for the given key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Why a single download failed
///
/// Failures are soft: they are logged, counted and never retried.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchFailure {
    /// The remote answered with a non-success status code
    #[error("bad status {0}")]
    BadStatus(u16),

    /// Connection, TLS or protocol fault while talking to the remote
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured per-request timeout
    #[error("timed out: {0}")]
    Timeout(String),

    /// Local filesystem fault while creating directories or writing the body
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for FetchFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchFailure::Timeout(e.to_string())
        } else {
            FetchFailure::Transport(e.to_string())
        }
    }
}

impl From<std::io::Error> for FetchFailure {
    fn from(e: std::io::Error) -> Self {
        FetchFailure::Io(e.to_string())
    }
}
