//! Logging setup for the `parquet-dl` binary.
//!
//! Initializes a `tracing-subscriber` writing human-readable lines to stderr.
//!
//! ## Configuration priority
//!
//! 1. `--log-level` flag (highest)
//! 2. `RUST_LOG` environment variable
//! 3. Default: `info`

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Build the filter for an explicit level or the environment
fn build_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level.to_lowercase()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Initialize the tracing subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber. A level of `off`
/// disables logging entirely.
pub fn init_logging(level: Option<&str>) {
    LOGGING_INITIALIZED.get_or_init(|| {
        if level.is_some_and(|l| l.eq_ignore_ascii_case("off")) {
            return;
        }

        let result = tracing_subscriber::registry()
            .with(build_filter(level))
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init();

        // Another subscriber may already be installed (e.g. by an embedding application)
        if let Err(e) = result {
            eprintln!("parquet-dl: logging not initialized: {e}");
        }
    });
}
