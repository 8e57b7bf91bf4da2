//! Structured logging with tracing
//!
//! Console output goes to stderr because stdout carries the MCP transport.
//! Two daily-rotated files live under the configured log directory:
//! `error.<date>.log` (errors only) and `combined.<date>.log` (everything
//! the filter lets through).

use anyhow::Context;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Number of rotated files kept per log
const MAX_LOG_FILES: usize = 7;

/// Flush guards for the non-blocking file writers.
///
/// Dropping this flushes and closes both files, so `main` holds it until exit.
pub struct LogGuards {
    _error: WorkerGuard,
    _combined: WorkerGuard,
}

/// Initialize logging with the provided configuration
pub fn init_logging(config: &Config) -> anyhow::Result<LogGuards> {
    std::fs::create_dir_all(&config.log_dir).with_context(|| {
        format!("Failed to create log directory {}", config.log_dir.display())
    })?;

    let (error_writer, error_guard) =
        tracing_appender::non_blocking(rolling_appender(&config.log_dir, "error")?);
    let (combined_writer, combined_guard) =
        tracing_appender::non_blocking(rolling_appender(&config.log_dir, "combined")?);

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);
    let combined = fmt::layer()
        .with_writer(combined_writer)
        .with_ansi(false)
        .with_target(true);
    let errors = fmt::layer()
        .with_writer(error_writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(LevelFilter::ERROR);

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(console)
        .with(combined)
        .with(errors)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        level = %config.log_level,
        dir = %config.log_dir.display(),
        "Logging initialized"
    );

    Ok(LogGuards {
        _error: error_guard,
        _combined: combined_guard,
    })
}

/// `RUST_LOG` wins over the configured level when it is set and valid
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn rolling_appender(dir: &Path, name: &str) -> anyhow::Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(name)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open {}.log in {}", name, dir.display()))
}
