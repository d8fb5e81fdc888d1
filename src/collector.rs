//! Single consumer of task outcomes.
//!
//! Workers never log their own results; the collector receives every [`TaskOutcome`] over the
//! completion channel, reports it to the observer and keeps the run totals.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::observer::Observer;
use crate::types::{DownloadResult, Event, TaskOutcome};

/// Running totals of completed tasks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    /// Successful downloads
    pub succeeded: u64,
    /// Failed downloads
    pub failed: u64,
    /// Cancelled downloads
    pub cancelled: u64,
    /// Body bytes written by successful downloads
    pub bytes: u64,
}

impl Tally {
    /// Results recorded so far
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed + self.cancelled
    }
}

/// Consumes outcomes and reports each one exactly once
pub struct ResultCollector {
    observer: Arc<dyn Observer>,
    tally: Tally,
}

impl ResultCollector {
    /// Create a collector reporting to `observer`
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self {
            observer,
            tally: Tally::default(),
        }
    }

    /// Report one outcome and add it to the totals
    pub fn record(&mut self, outcome: &TaskOutcome) {
        match &outcome.result {
            DownloadResult::Success { bytes } => {
                self.tally.succeeded += 1;
                self.tally.bytes += bytes;
            }
            DownloadResult::Failure { .. } => self.tally.failed += 1,
            DownloadResult::Cancelled => self.tally.cancelled += 1,
        }
        self.observer.on_event(&Event::from_outcome(outcome));
    }

    /// Totals so far
    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Consume outcomes until every sender is gone
    pub async fn drain(mut self, mut outcomes: mpsc::UnboundedReceiver<TaskOutcome>) -> Tally {
        while let Some(outcome) = outcomes.recv().await {
            self.record(&outcome);
        }
        self.tally
    }
}
