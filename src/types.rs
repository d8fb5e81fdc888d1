//! Core types for parquet-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::FetchFailure;

/// One manifest row projected onto the four required columns
///
/// Null cells are `None`. Non-string scalars (e.g. an integer `id`) are already stringified.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Opaque identifier, becomes the first path component
    pub id: Option<String>,
    /// Remote locator
    pub url: Option<String>,
    /// Grouping key, becomes the file stem
    pub category: Option<String>,
    /// Media type such as `image/jpeg`, or a bare extension
    pub media_type: Option<String>,
}

/// A single unit of work: fetch `source_url` into `destination`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Remote URL to fetch
    pub source_url: String,
    /// Where the body is written, `<output>/<id>/<category>.<ext>`
    pub destination: PathBuf,
}

/// Outcome of one download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadResult {
    /// Body written to the destination
    Success {
        /// Number of body bytes written
        bytes: u64,
    },
    /// Download failed; nothing is left at the destination
    Failure {
        /// Why it failed
        reason: FetchFailure,
    },
    /// The run was cancelled before this download finished
    Cancelled,
}

impl DownloadResult {
    /// Shorthand for a failed result
    pub fn failure(reason: FetchFailure) -> Self {
        DownloadResult::Failure { reason }
    }

    /// True for [`DownloadResult::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadResult::Success { .. })
    }
}

/// A task paired with its result, as delivered to the collector
#[derive(Clone, Debug)]
pub struct TaskOutcome {
    /// The task that was executed
    pub task: DownloadTask,
    /// What happened
    pub result: DownloadResult,
}

/// Why a record did not produce a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `id` was null
    MissingId,
    /// URL was null
    MissingUrl,
    /// Category was null
    MissingCategory,
    /// Media type was null, so no extension can be derived
    MissingMediaType,
    /// `id` or category would escape the output root (absolute, empty, or has a `.`/`..` segment)
    UnsafePathComponent,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::MissingId => "missing id",
            SkipReason::MissingUrl => "missing url",
            SkipReason::MissingCategory => "missing category",
            SkipReason::MissingMediaType => "missing media type",
            SkipReason::UnsafePathComponent => "unsafe path component",
        };
        f.write_str(text)
    }
}

/// Totals for a finished run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Row groups in the manifest
    pub row_groups: usize,
    /// Records read from the manifest
    pub records: u64,
    /// Records that did not produce a task
    pub skipped: u64,
    /// Downloads written successfully
    pub succeeded: u64,
    /// Downloads that failed
    pub failed: u64,
    /// Downloads resolved as cancelled
    pub cancelled: u64,
    /// Total body bytes written
    pub bytes: u64,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of tasks that produced a result
    pub fn tasks(&self) -> u64 {
        self.succeeded + self.failed + self.cancelled
    }

    /// True when every submitted task succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// Event emitted while a run progresses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Manifest opened and schema validated
    RunStarted {
        /// Number of row groups that will be read
        row_groups: usize,
    },

    /// Reader moved on to the next row group
    RowGroupStarted {
        /// Zero-based row group index
        index: usize,
        /// Total row groups
        total: usize,
        /// Rows in this group
        rows: u64,
    },

    /// A record was excluded from the task set
    RecordSkipped {
        /// Row group the record came from
        row_group: usize,
        /// Why
        reason: SkipReason,
    },

    /// A worker slot started fetching
    FetchStarted {
        /// Source URL
        url: String,
        /// Destination path
        destination: PathBuf,
    },

    /// A worker slot finished fetching, whatever the outcome
    FetchFinished {
        /// Source URL
        url: String,
    },

    /// A download finished successfully
    Downloaded {
        /// Source URL
        url: String,
        /// Destination path
        destination: PathBuf,
        /// Bytes written
        bytes: u64,
    },

    /// A download failed
    DownloadFailed {
        /// Source URL
        url: String,
        /// Destination path
        destination: PathBuf,
        /// Cause
        reason: FetchFailure,
    },

    /// A download was cancelled
    DownloadCancelled {
        /// Source URL
        url: String,
    },

    /// All submitted tasks have a result
    RunFinished {
        /// Totals
        summary: RunSummary,
    },
}

impl Event {
    /// Build the completion event matching a task outcome
    pub fn from_outcome(outcome: &TaskOutcome) -> Self {
        let url = outcome.task.source_url.clone();
        let destination = outcome.task.destination.clone();
        match &outcome.result {
            DownloadResult::Success { bytes } => Event::Downloaded {
                url,
                destination,
                bytes: *bytes,
            },
            DownloadResult::Failure { reason } => Event::DownloadFailed {
                url,
                destination,
                reason: reason.clone(),
            },
            DownloadResult::Cancelled => Event::DownloadCancelled { url },
        }
    }
}
