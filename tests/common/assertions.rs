//! Filesystem and event assertions

use std::path::{Path, PathBuf};
use std::time::Duration;

use parquet_dl::Event;
use tokio::sync::broadcast;

/// Every regular file under `root`, relative to it, sorted
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .expect("entry under root")
                .to_path_buf()
        })
        .collect::<Vec<_>>();
    files.sort();
    files
}

/// Drain a subscription until `RunFinished` arrives or `timeout` passes
pub async fn collect_events_until_finished(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
) -> Vec<Event> {
    let mut seen = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let finished = matches!(event, Event::RunFinished { .. });
            seen.push(event);
            if finished {
                break;
            }
        }
    })
    .await;
    seen
}
