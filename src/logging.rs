//! Logging setup.
//!
//! The dashboard owns the terminal, so in that mode log lines go to a file.
//! One-shot runs log to stderr and keep stdout for the snapshot JSON.
//! Both honor `RUST_LOG` and default to `info`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILE: &str = "chile-swissknife.log";

/// Keeps the background writer alive. Dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to `log_dir/log_file`, truncating it first.
pub fn init_file_logging(log_dir: &Path, log_file: &str) -> io::Result<LoggingGuard> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(log_file), "")?;

    let appender = tracing_appender::rolling::never(log_dir, log_file);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    // try_init: a second initialization in the same process is a no-op
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(layer)
        .try_init();

    Ok(LoggingGuard {
        _file_guard: Some(guard),
    })
}

/// Log to stderr.
pub fn init_stderr_logging() -> LoggingGuard {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(layer)
        .try_init();

    LoggingGuard { _file_guard: None }
}

/// Directory for the dashboard log file.
pub fn default_log_dir() -> PathBuf {
    std::env::temp_dir()
}
