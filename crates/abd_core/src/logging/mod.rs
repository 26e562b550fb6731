//! Logging infrastructure for Audio Blu-ray Author.
//!
//! This module provides:
//! - Per-build loggers with file + callback dual output
//! - Compact mode with progress filtering
//! - Tail buffer of tool output for failure diagnosis
//! - Global `tracing` setup, optionally with a daily rolling log file
//!
//! # Example
//!
//! ```no_run
//! use abd_core::logging::{BuildLogger, LogConfig};
//!
//! let logger = BuildLogger::new("build_20240101", "/path/to/logs", LogConfig::default(), None)
//!     .unwrap();
//!
//! logger.phase("Audio");
//! logger.command("ffmpeg -i 01.flac ...");
//! logger.progress(50);
//! logger.success("Build completed");
//! ```

mod build_logger;
mod types;

use std::path::Path;

pub use build_logger::BuildLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber (stderr only).
///
/// Respects `RUST_LOG`, falling back to `default_level`. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(env_filter(default_level))
        .try_init();
}

/// Initialize tracing to stderr plus a daily rolling file in `log_dir`.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the lifetime of the program.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    log_dir: impl AsRef<Path>,
) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir.as_ref())?;
    let appender = tracing_appender::rolling::daily(log_dir.as_ref(), "audio-bluray.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(env_filter(default_level))
        .try_init();

    Ok(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()))
}
