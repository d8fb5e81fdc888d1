//! Configuration types for parquet-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Names of the manifest columns projected by the reader
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Identifier column; any scalar type, stringified (default: "id")
    #[serde(default = "default_id_column")]
    pub id: String,

    /// Source URL column (default: "identifier")
    #[serde(default = "default_url_column")]
    pub url: String,

    /// Grouping key used as the file stem (default: "foo")
    #[serde(default = "default_category_column")]
    pub category: String,

    /// Media type or bare extension (default: "format")
    #[serde(default = "default_media_type_column")]
    pub media_type: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: default_id_column(),
            url: default_url_column(),
            category: default_category_column(),
            media_type: default_media_type_column(),
        }
    }
}

impl ColumnMapping {
    /// Column names in projection order: id, url, category, media type
    pub fn names(&self) -> [&str; 4] {
        [&self.id, &self.url, &self.category, &self.media_type]
    }
}

/// Upper bound on `workers`; each worker holds one semaphore permit
pub const MAX_WORKERS: usize = 4096;

/// Upper bound on the task queue; tokio channels panic above `Semaphore::MAX_PERMITS`
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Main configuration for a download run
///
/// Every field has a default, so a JSON file only needs to name what it overrides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Parquet manifest to read
    #[serde(default)]
    pub parquet_path: PathBuf,

    /// Root of the output tree (required)
    #[serde(default)]
    pub output_dir: PathBuf,

    /// Maximum number of downloads in flight at once (default: 10)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Queued tasks allowed per worker before the reader blocks (default: 4)
    #[serde(default = "default_queue_depth_per_worker")]
    pub queue_depth_per_worker: usize,

    /// Whole-request timeout per download (default: 300 seconds, None = unbounded)
    #[serde(
        default = "default_request_timeout",
        with = "optional_duration_serde"
    )]
    pub request_timeout: Option<Duration>,

    /// TCP connect timeout (default: 30 seconds, None = unbounded)
    #[serde(
        default = "default_connect_timeout",
        with = "optional_duration_serde"
    )]
    pub connect_timeout: Option<Duration>,

    /// Deadline for the whole run; on expiry outstanding work resolves as cancelled
    #[serde(default, with = "optional_duration_serde")]
    pub run_deadline: Option<Duration>,

    /// Write buffer size in bytes for streamed bodies (default: 64 KiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Manifest column names
    #[serde(default)]
    pub columns: ColumnMapping,

    /// Treat any failed or cancelled download as a failed run (default: false)
    #[serde(default)]
    pub fail_on_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parquet_path: PathBuf::new(),
            output_dir: PathBuf::new(),
            workers: default_workers(),
            queue_depth_per_worker: default_queue_depth_per_worker(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            run_deadline: None,
            chunk_size: default_chunk_size(),
            user_agent: default_user_agent(),
            columns: ColumnMapping::default(),
            fail_on_error: false,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Capacity of the task queue between the reader and the worker pool
    pub fn queue_capacity(&self) -> usize {
        self.workers.saturating_mul(self.queue_depth_per_worker)
    }

    /// Check settings that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.parquet_path.as_os_str().is_empty() {
            return Err(Error::config("parquet_path", "a manifest path is required"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config("output_dir", "an output directory is required"));
        }
        if self.workers == 0 {
            return Err(Error::config("workers", "must be at least 1"));
        }
        if self.workers > MAX_WORKERS {
            return Err(Error::config(
                "workers",
                format!("must be at most {MAX_WORKERS}"),
            ));
        }
        if self.queue_depth_per_worker == 0 {
            return Err(Error::config(
                "queue_depth_per_worker",
                "must be at least 1",
            ));
        }
        if self.queue_capacity() > MAX_QUEUE_CAPACITY {
            return Err(Error::config(
                "queue_depth_per_worker",
                format!("workers x queue depth must be at most {MAX_QUEUE_CAPACITY}"),
            ));
        }
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size", "must be at least 1 byte"));
        }
        for (key, name) in [
            ("columns.id", &self.columns.id),
            ("columns.url", &self.columns.url),
            ("columns.category", &self.columns.category),
            ("columns.media_type", &self.columns.media_type),
        ] {
            if name.trim().is_empty() {
                return Err(Error::config(key, "column name must not be empty"));
            }
        }
        Ok(())
    }
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_url_column() -> String {
    "identifier".to_string()
}

fn default_category_column() -> String {
    "foo".to_string()
}

fn default_media_type_column() -> String {
    "format".to_string()
}

fn default_workers() -> usize {
    10
}

fn default_queue_depth_per_worker() -> usize {
    4
}

fn default_request_timeout() -> Option<Duration> {
    Some(Duration::from_secs(300))
}

fn default_connect_timeout() -> Option<Duration> {
    Some(Duration::from_secs(30))
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_user_agent() -> String {
    format!("parquet-dl/{}", env!("CARGO_PKG_VERSION"))
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
