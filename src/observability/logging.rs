//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Map the numeric `--log-level` of each front-end to a tracing level
//! - Write to the console and to the configured log file
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - The file layer is non-blocking; the caller keeps the `WorkerGuard`
//!   alive until exit so buffered lines are flushed

use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::StartupError;

/// Daemon levels: 0 error, 1 warning, 2 info, 3 debug, 4 trace.
pub fn daemon_level(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Wallet-service levels: 0 fatal, 1 error, 2 warning, 3 info, 4 debug, 5 trace.
pub fn service_level(level: u8) -> LevelFilter {
    match level {
        0 | 1 => LevelFilter::ERROR,
        2 => LevelFilter::WARN,
        3 => LevelFilter::INFO,
        4 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Place a relative log file next to the executable.
///
/// An empty setting falls back to `<exe-stem>.log`.
pub fn resolve_log_path(log_file: &Path, exe: &Path) -> PathBuf {
    let exe_dir = exe.parent().unwrap_or_else(|| Path::new("."));

    if log_file.as_os_str().is_empty() {
        let stem = exe
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "node".to_string());
        return exe_dir.join(format!("{stem}.log"));
    }

    if log_file.is_absolute() {
        log_file.to_path_buf()
    } else {
        exe_dir.join(log_file)
    }
}

/// Install the global subscriber.
pub fn init_logging(level: LevelFilter, log_file: &Path) -> Result<WorkerGuard, StartupError> {
    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .ok_or_else(|| StartupError::Logging(format!("{} is not a file path", log_file.display())))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(|e| StartupError::Logging(e.to_string()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = || {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(filter());
    let console_layer = tracing_subscriber::fmt::layer().with_filter(filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| StartupError::Logging(e.to_string()))?;

    Ok(guard)
}
