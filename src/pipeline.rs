//! Run orchestration.
//!
//! Wires the reader, task builder, worker pool and collector together:
//!
//! ```text
//! spawn_blocking: MetadataReader -> build_task --blocking_send--> bounded queue (W x k)
//!                                                                      |
//!                        Scheduler (W permits) -> Downloader --outcomes--> ResultCollector
//! ```
//!
//! Setup errors (bad config, unreadable manifest, missing columns, unusable output directory)
//! are returned before any request is made.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::collector::ResultCollector;
use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::metadata::MetadataReader;
use crate::observer::Observer;
use crate::scheduler::Scheduler;
use crate::task_builder::build_task;
use crate::types::{DownloadTask, Event, RunSummary};


/// What the reader side produced
#[derive(Debug, Default)]
struct Production {
    records: u64,
    skipped: u64,
    error: Option<Error>,
}

/// Download everything the manifest in `config` describes
///
/// Returns once every submitted task has a result. Cancelling `cancel` (or reaching
/// `config.run_deadline`) stops reading new rows and resolves outstanding downloads as
/// cancelled; the run still returns a summary in that case.
///
/// # Errors
///
/// Fatal setup errors are returned before any download starts. A row group that fails to
/// decode mid-run is returned as [`Error::Read`] after the already submitted tasks finish.
pub async fn run(
    config: Config,
    observer: Arc<dyn Observer>,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    config.validate()?;
    let started_at = Utc::now();
    let clock = Instant::now();

    let reader = {
        let path = config.parquet_path.clone();
        let columns = config.columns.clone();
        tokio::task::spawn_blocking(move || MetadataReader::open(&path, &columns))
            .await
            .map_err(|e| Error::Other(format!("manifest open task failed: {e}")))??
    };
    let row_groups = reader.num_row_groups();

    // Only touch the filesystem once the manifest is known to be usable
    prepare_output_dir(&config.output_dir).await?;

    let downloader = Downloader::new(&config, observer.clone())?;
    observer.on_event(&Event::RunStarted { row_groups });

    // Child token: the deadline cancels this run without touching the caller's token
    let run_cancel = cancel.child_token();
    let deadline = config.run_deadline.map(|limit| {
        let token = run_cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {
                    tracing::warn!(deadline_secs = limit.as_secs(), "Run deadline reached, cancelling");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        })
    });

    let (task_tx, task_rx) = mpsc::channel(config.queue_capacity().max(1));
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

    let producer = {
        let observer = observer.clone();
        let token = run_cancel.clone();
        let output_root = config.output_dir.clone();
        tokio::task::spawn_blocking(move || {
            produce(&reader, &output_root, &task_tx, observer.as_ref(), &token)
        })
    };

    let pool = Scheduler::new(config.workers, downloader).spawn(task_rx, outcome_tx, run_cancel.clone());
    let tally = ResultCollector::new(observer.clone()).drain(outcome_rx).await;

    if let Some(handle) = deadline {
        handle.abort();
    }
    pool.await
        .map_err(|e| Error::Other(format!("worker pool task failed: {e}")))?;
    let production = producer
        .await
        .map_err(|e| Error::Other(format!("manifest reader task failed: {e}")))?;

    if let Some(err) = production.error {
        tracing::error!(error = %err, "Manifest read aborted the run");
        return Err(err);
    }

    let summary = RunSummary {
        row_groups,
        records: production.records,
        skipped: production.skipped,
        succeeded: tally.succeeded,
        failed: tally.failed,
        cancelled: tally.cancelled,
        bytes: tally.bytes,
        started_at,
        elapsed: clock.elapsed(),
    };
    observer.on_event(&Event::RunFinished {
        summary: summary.clone(),
    });
    Ok(summary)
}

/// Create the output root, rejecting a path that exists but is not a directory
async fn prepare_output_dir(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::config(
            "output_dir",
            format!("{} exists and is not a directory", path.display()),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(path).await.map_err(|e| {
                Error::config(
                    "output_dir",
                    format!("cannot create {}: {e}", path.display()),
                )
            })
        }
        Err(e) => Err(Error::config(
            "output_dir",
            format!("cannot access {}: {e}", path.display()),
        )),
    }
}

/// Read row groups in order and feed tasks into the queue
///
/// Runs on a blocking thread; `blocking_send` parks it while the queue is full.
fn produce(
    reader: &MetadataReader,
    output_root: &Path,
    tasks: &mpsc::Sender<DownloadTask>,
    observer: &dyn Observer,
    cancel: &CancellationToken,
) -> Production {
    let mut production = Production::default();
    let total = reader.num_row_groups();

    'groups: for index in 0..total {
        if cancel.is_cancelled() {
            break;
        }
        observer.on_event(&Event::RowGroupStarted {
            index,
            total,
            rows: reader.row_group_len(index).unwrap_or(0),
        });

        let records = match reader.row_group(index) {
            Ok(records) => records,
            Err(e) => {
                production.error = Some(e);
                break;
            }
        };

        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    production.error = Some(e);
                    break 'groups;
                }
            };
            production.records += 1;

            let task = match build_task(&record, output_root) {
                Ok(task) => task,
                Err(reason) => {
                    production.skipped += 1;
                    observer.on_event(&Event::RecordSkipped {
                        row_group: index,
                        reason,
                    });
                    continue;
                }
            };

            if cancel.is_cancelled() || tasks.blocking_send(task).is_err() {
                break 'groups;
            }
        }
    }

    tracing::debug!(
        records = production.records,
        skipped = production.skipped,
        "Manifest reader finished"
    );
    production
}
