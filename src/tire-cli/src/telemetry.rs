//! Structured logging for the command line tool
//!
//! - JSON formatted logs to file
//! - Human-readable console output on stderr
//! - Size-based rotation (10MB per file)
//! - Daily rotation with numbered files

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

fn default_filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::new("tire=info,tire_cli=info,warn"),
        1 => EnvFilter::new("tire=debug,tire_cli=debug,info"),
        _ => EnvFilter::new("trace"),
    }
}

/// Initialize tracing with file logging
///
/// Returns a guard that must be kept alive to ensure logs are flushed
pub fn init_telemetry(log_dir: &Path, verbose: u8) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    // Rotates when file reaches 10MB or daily, whichever comes first
    let file_appender = RollingFileAppender::new(
        log_dir.join("tire.log"),
        RollingConditionBasic::new()
            .daily()
            .max_size(10 * 1024 * 1024), // 10 MB
        9, // Keep up to 10 files per day (0-9)
    )?;

    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    // TIRE_LOG wins over -v flags
    let env_filter = EnvFilter::try_from_env("TIRE_LOG").unwrap_or_else(|_| default_filter(verbose));

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_target(true)
        .with_thread_ids(true);

    // stdout carries command output, so the console layer goes to stderr
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::debug!("Telemetry initialized with file logging to {:?}", log_dir);

    Ok(guard)
}
