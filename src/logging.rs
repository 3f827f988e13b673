// Logging setup for the demo binary
//
// Logs go to a daily-rotating file, never to stdout: the TUI owns the
// terminal's alternate screen and stray log lines would garble it.
// Filtering follows RUST_LOG, defaulting to info.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Directory the demo binary logs into
pub fn log_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("streampane"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Initialize file logging. The returned guard must live for the whole
/// run; dropping it flushes and stops the background writer.
pub fn init() -> Result<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, "streampane.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!(dir = %dir.display(), "logging initialized");
    Ok(guard)
}
