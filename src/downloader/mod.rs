//! Single-task download execution.
//!
//! [`Downloader::download`] never returns an error: every outcome, including transport faults,
//! bad status codes, local I/O faults and cancellation, is a [`DownloadResult`].
//!
//! The body is streamed into a hidden `.part` sibling of the destination and renamed into place
//! once complete, so a failed or cancelled download leaves no file at the destination.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{FetchFailure, Result};
use crate::observer::Observer;
use crate::types::{DownloadResult, DownloadTask, Event};


/// Distinguishes partial files of concurrent downloads that target the same destination
static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fetches one URL to one path
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    chunk_size: usize,
    observer: Arc<dyn Observer>,
}

impl Downloader {
    /// Build a downloader with an HTTP client configured from `config`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::error::Error::Http) if the client cannot be built
    /// (e.g. the TLS backend fails to initialize).
    pub fn new(config: &Config, observer: Arc<dyn Observer>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self::with_client(client, config.chunk_size, observer))
    }

    /// Build a downloader around an existing client
    pub fn with_client(
        client: reqwest::Client,
        chunk_size: usize,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
            observer,
        }
    }

    /// Download `task`, resolving as [`DownloadResult::Cancelled`] if `cancel` fires first
    pub async fn download(&self, task: &DownloadTask, cancel: &CancellationToken) -> DownloadResult {
        if cancel.is_cancelled() {
            return DownloadResult::Cancelled;
        }

        self.observer.on_event(&Event::FetchStarted {
            url: task.source_url.clone(),
            destination: task.destination.clone(),
        });

        let part = partial_path(&task.destination);
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // The fetch future was dropped mid-write; clear whatever it left behind
                tokio::fs::remove_file(&part).await.ok();
                None
            }
            outcome = self.fetch_to_part(task, &part) => Some(outcome),
        };

        // The rename is not raced against cancellation
        let result = match fetched {
            None => DownloadResult::Cancelled,
            Some(Ok(bytes)) => match publish(&part, &task.destination).await {
                Ok(()) => {
                    tracing::debug!(
                        url = %task.source_url,
                        path = %task.destination.display(),
                        bytes,
                        "Body written"
                    );
                    DownloadResult::Success { bytes }
                }
                Err(reason) => DownloadResult::failure(reason),
            },
            Some(Err(reason)) => DownloadResult::failure(reason),
        };

        self.observer.on_event(&Event::FetchFinished {
            url: task.source_url.clone(),
        });
        result
    }

    /// Fetch the body into `part`, returning the number of bytes written
    async fn fetch_to_part(
        &self,
        task: &DownloadTask,
        part: &Path,
    ) -> std::result::Result<u64, FetchFailure> {
        let mut response = self.client.get(&task.source_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::BadStatus(status.as_u16()));
        }

        if let Some(parent) = task.destination.parent() {
            // create_dir_all treats a concurrently created directory as success
            tokio::fs::create_dir_all(parent).await?;
        }

        match write_body(&mut response, part, self.chunk_size).await {
            Ok(written) => Ok(written),
            Err(e) => {
                tokio::fs::remove_file(part).await.ok();
                Err(e)
            }
        }
    }
}

/// Move a completed partial file onto its destination
async fn publish(part: &Path, destination: &Path) -> std::result::Result<(), FetchFailure> {
    if let Err(e) = tokio::fs::rename(part, destination).await {
        tokio::fs::remove_file(part).await.ok();
        return Err(e.into());
    }
    Ok(())
}

/// Stream the response body into `path` through a buffer of `chunk_size` bytes
async fn write_body(
    response: &mut reqwest::Response,
    path: &Path,
    chunk_size: usize,
) -> std::result::Result<u64, FetchFailure> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = tokio::io::BufWriter::with_capacity(chunk_size, file);
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await? {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    writer.get_ref().sync_all().await?;
    Ok(written)
}

/// Hidden, unique sibling of `destination` used while the body is in flight
pub(crate) fn partial_path(destination: &Path) -> PathBuf {
    let seq = PART_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.{seq}.part"))
}
