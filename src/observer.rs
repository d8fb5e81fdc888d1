//! Run observation.
//!
//! The pipeline reports progress through an injected [`Observer`] rather than a global logger.
//! [`TracingObserver`] turns events into log lines; a `broadcast::Sender<Event>` lets library
//! consumers subscribe; [`Fanout`] combines several observers.

use std::sync::Arc;

use crate::error::FetchFailure;
use crate::types::Event;

/// Receives every [`Event`] of a run
///
/// Called from worker tasks concurrently, so implementations must be cheap and must not block.
pub trait Observer: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &Event);
}

/// Logs events through `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event) {
        match event {
            Event::RunStarted { row_groups } => {
                tracing::info!(row_groups, "Processing downloads in {} groups", row_groups);
            }
            Event::RowGroupStarted { index, total, rows } => {
                tracing::info!(row_group = index, rows, "Download group {}/{}", index, total);
            }
            Event::RecordSkipped { row_group, reason } => {
                tracing::debug!(row_group, reason = %reason, "Skipping record");
            }
            Event::FetchStarted { url, .. } => {
                tracing::trace!(url = %url, "Fetching");
            }
            Event::FetchFinished { url } => {
                tracing::trace!(url = %url, "Fetch finished");
            }
            Event::Downloaded {
                url,
                destination,
                bytes,
            } => {
                tracing::info!(
                    url = %url,
                    path = %destination.display(),
                    bytes,
                    "Successfully downloaded"
                );
            }
            Event::DownloadFailed { url, reason, .. } => match reason {
                FetchFailure::BadStatus(code) => {
                    tracing::warn!(url = %url, status = code, "Failed to download");
                }
                other => {
                    tracing::error!(url = %url, error = %other, "Error downloading");
                }
            },
            Event::DownloadCancelled { url } => {
                tracing::warn!(url = %url, "Download cancelled");
            }
            Event::RunFinished { summary } => {
                tracing::info!(
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    cancelled = summary.cancelled,
                    skipped = summary.skipped,
                    bytes = summary.bytes,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "Run complete"
                );
            }
        }
    }
}

impl Observer for tokio::sync::broadcast::Sender<Event> {
    fn on_event(&self, event: &Event) {
        // No subscribers is not an error
        self.send(event.clone()).ok();
    }
}

/// Forwards each event to every wrapped observer, in order
#[derive(Clone, Default)]
pub struct Fanout {
    observers: Vec<Arc<dyn Observer>>,
}

impl Fanout {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer
    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl Observer for Fanout {
    fn on_event(&self, event: &Event) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
