//! Bounded worker pool that runs at most `W` [`DownloadTask`]s concurrently.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! [reader] --bounded task channel--> [Scheduler] --spawn (W permits)--> [Downloader]
//!                                                                          |
//!                                   [ResultCollector] <--completion channel+
//! ```
//!
//! The dispatcher acquires a semaphore permit *before* taking the next task off the queue, so
//! tasks stay in the bounded channel (and the reader blocks on it) while every slot is busy.
//! Each spawned download holds its permit until its [`TaskOutcome`] has been sent.
//!
//! Tasks are taken in FIFO order; outcomes arrive in completion order.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::downloader::Downloader;
use crate::types::{DownloadResult, DownloadTask, TaskOutcome};


/// Fixed-capacity pool of concurrent downloads
pub struct Scheduler {
    workers: usize,
    downloader: Downloader,
}

impl Scheduler {
    /// Create a pool running at most `workers` downloads at once (minimum 1)
    pub fn new(workers: usize, downloader: Downloader) -> Self {
        Self {
            workers: workers.max(1),
            downloader,
        }
    }

    /// Number of worker slots
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run the dispatcher on a background task
    pub fn spawn(
        self,
        tasks: mpsc::Receiver<DownloadTask>,
        outcomes: mpsc::UnboundedSender<TaskOutcome>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(tasks, outcomes, cancel))
    }

    /// Dispatch tasks until the queue closes, then wait for every download to finish
    ///
    /// Every task received yields exactly one [`TaskOutcome`]. Once `cancel` fires, tasks still
    /// queued are resolved as [`DownloadResult::Cancelled`] without touching the network.
    pub async fn run(
        self,
        mut tasks: mpsc::Receiver<DownloadTask>,
        outcomes: mpsc::UnboundedSender<TaskOutcome>,
        cancel: CancellationToken,
    ) {
        let limiter = Arc::new(Semaphore::new(self.workers));
        let mut dispatched = 0u64;

        loop {
            // Acquire a slot first so queued tasks wait in the bounded channel
            let permit = match limiter.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };

            let Some(task) = tasks.recv().await else {
                break;
            };
            dispatched += 1;

            if cancel.is_cancelled() {
                outcomes
                    .send(TaskOutcome {
                        task,
                        result: DownloadResult::Cancelled,
                    })
                    .ok();
                continue;
            }

            let downloader = self.downloader.clone();
            let outcomes = outcomes.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let result = downloader.download(&task, &cancel).await;
                // The collector outlives the pool; a closed channel means the run was abandoned
                outcomes.send(TaskOutcome { task, result }).ok();
            });
        }

        // All permits back means every spawned download has reported
        let all = u32::try_from(self.workers).unwrap_or(u32::MAX);
        if limiter.acquire_many(all).await.is_err() {
            tracing::warn!("worker pool closed before all downloads reported");
        }

        tracing::debug!(dispatched, "Scheduler drained");
    }
}
