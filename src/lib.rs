//! # parquet-dl
//!
//! Concurrent bulk downloader driven by a Parquet manifest.
//!
//! Each manifest row names an `id`, a URL, a category and a media type. The row becomes one
//! download written to `<output>/<id>/<category>.<extension>`, where the extension is the part
//! of the media type after its last `/`.
//!
//! ## Design
//!
//! - **Bounded** - at most `workers` downloads run at once, and the manifest reader blocks once
//!   `workers x queue_depth_per_worker` tasks are waiting
//! - **Fault isolated** - a failed download is recorded and the run carries on
//! - **Cancellable** - a [`CancellationToken`] (or the run deadline) resolves outstanding work as
//!   cancelled instead of hanging
//! - **Observable** - progress is reported as [`Event`]s to an injected [`Observer`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use parquet_dl::{Config, TracingObserver, run};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         parquet_path: "manifest.parquet".into(),
//!         output_dir: "downloads".into(),
//!         workers: 16,
//!         ..Default::default()
//!     };
//!
//!     let summary = run(config, Arc::new(TracingObserver), CancellationToken::new()).await?;
//!     println!("{} downloaded, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Result aggregation
pub mod collector;
/// Configuration types
pub mod config;
/// Single-task download execution
pub mod downloader;
/// Error types
pub mod error;
/// Logging setup for binaries
pub mod logging;
/// Parquet manifest reading
pub mod metadata;
/// Run observers
pub mod observer;
/// Run orchestration
pub mod pipeline;
/// Bounded worker pool
pub mod scheduler;
/// Record to task conversion
pub mod task_builder;
/// Core types and events
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use tokio_util::sync::CancellationToken;

// Re-export commonly used types
pub use collector::{ResultCollector, Tally};
pub use config::{ColumnMapping, Config};
pub use downloader::Downloader;
pub use error::{Error, FetchFailure, Result};
pub use metadata::MetadataReader;
pub use observer::{Fanout, Observer, TracingObserver};
pub use pipeline::run;
pub use scheduler::Scheduler;
pub use task_builder::{build_task, extension_for};
pub use types::{
    DownloadResult, DownloadTask, Event, MetadataRecord, RunSummary, SkipReason, TaskOutcome,
};

/// Cancel `token` when the process receives a termination signal
///
/// Spawns a background task and returns immediately; the task ends after the first signal or
/// once the token is cancelled some other way.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use parquet_dl::{Config, TracingObserver, cancel_on_shutdown, run};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cancel = CancellationToken::new();
///     cancel_on_shutdown(cancel.clone());
///
///     run(Config::default(), Arc::new(TracingObserver), cancel).await?;
///     Ok(())
/// }
/// ```
pub fn cancel_on_shutdown(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                tracing::warn!("Shutdown requested, cancelling outstanding downloads");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_watcher_exits_when_token_is_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = cancel_on_shutdown(token.clone());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher should stop once the token is cancelled")
            .unwrap();
    }
}
