//! Tracing setup for the service binaries
//!
//! Two layers share one `EnvFilter`:
//! - JSON lines to `./logs/fmodata.log`, rotated daily or at 10MB
//! - Human-readable console output
//!
//! `RUST_LOG` overrides [`DEFAULT_FILTER`].

use anyhow::Result;
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const DEFAULT_FILTER: &str =
    "fmodata=debug,fmodata_server=debug,fmodata_core=debug,fmodata_rs=debug,actix_web=info";

const LOG_DIR: &str = "./logs";
const LOG_FILE: &str = "fmodata.log";
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber with file and console output.
///
/// Returns a guard that must be kept alive to ensure logs are flushed
pub fn init_telemetry() -> Result<WorkerGuard> {
    let log_dir = Path::new(LOG_DIR);
    std::fs::create_dir_all(log_dir)?;

    // fmodata.log, fmodata.log.1, ... up to 9 rotated files
    let file_appender = RollingFileAppender::new(
        log_dir.join(LOG_FILE),
        RollingConditionBasic::new().daily().max_size(MAX_LOG_SIZE),
        9,
    )?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_target(true)
        .with_thread_ids(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!("Logging to {:?} (daily or 10MB rotation)", log_dir.join(LOG_FILE));
    Ok(guard)
}

/// Console-only subscriber for short-lived tools
pub fn init_console() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;
    Ok(())
}

/// Flush buffered file output before exit
pub fn shutdown_telemetry(guard: WorkerGuard) {
    tracing::info!("Telemetry shutdown complete");
    drop(guard);
}
