use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use parquet_dl::logging::init_logging;
use parquet_dl::{Config, RunSummary, TracingObserver, cancel_on_shutdown, run};
use tokio_util::sync::CancellationToken;

/// Exit status when `--strict` is set and some downloads did not succeed
const EXIT_INCOMPLETE: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "parquet-dl", version)]
#[command(about = "Download every file listed in a Parquet manifest", long_about = None)]
struct Cli {
    /// Parquet manifest to read
    #[arg(short, long, required_unless_present = "config")]
    parquet: Option<PathBuf>,

    /// Root directory for downloaded files
    #[arg(short, long, required_unless_present = "config")]
    output: Option<PathBuf>,

    /// Maximum concurrent downloads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Queued tasks allowed per worker before reading pauses
    #[arg(long)]
    queue_depth: Option<usize>,

    /// Per-request timeout in seconds (0 disables it)
    #[arg(long, value_name = "SECS")]
    request_timeout: Option<u64>,

    /// Cancel whatever is still outstanding after this many seconds
    #[arg(long, value_name = "SECS")]
    run_deadline: Option<u64>,

    /// JSON configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off); defaults to RUST_LOG or info
    #[arg(long)]
    log_level: Option<String>,

    /// Exit with status 2 if any download failed or was cancelled
    #[arg(long)]
    strict: bool,
}

impl Cli {
    /// Layer the flags over the config file (or defaults)
    fn into_config(self) -> parquet_dl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(parquet) = self.parquet {
            config.parquet_path = parquet;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(depth) = self.queue_depth {
            config.queue_depth_per_worker = depth;
        }
        if let Some(secs) = self.request_timeout {
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = self.run_deadline {
            config.run_deadline = Some(Duration::from_secs(secs));
        }
        if self.strict {
            config.fail_on_error = true;
        }
        Ok(config)
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} succeeded, {} failed, {} cancelled, {} skipped ({} records in {} row groups, {} bytes, {:.1}s)",
        summary.succeeded,
        summary.failed,
        summary.cancelled,
        summary.skipped,
        summary.records,
        summary.row_groups,
        summary.bytes,
        summary.elapsed.as_secs_f64(),
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let strict = config.fail_on_error;

    let cancel = CancellationToken::new();
    let watcher = cancel_on_shutdown(cancel.clone());

    let result = run(config, Arc::new(TracingObserver), cancel.clone()).await;

    // Stop the signal watcher
    cancel.cancel();
    watcher.await.ok();

    match result {
        Ok(summary) => {
            print_summary(&summary);
            if strict && !summary.all_succeeded() {
                ExitCode::from(EXIT_INCOMPLETE)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
