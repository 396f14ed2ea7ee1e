//! Logging setup for feeder.
//!
//! The interactive prompt shares the terminal with log output, so the full
//! log goes to the log file and only feeder warnings reach stderr.
//! `RUST_LOG` replaces the configured file filter when set.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Target of every event emitted by this crate.
const CRATE_TARGET: &str = "feeder";

/// Map a configured level name onto a tracing level; unknown names mean INFO.
fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter directives for a configured level: feeder at that level, its
/// dependencies (reqwest, hyper, rustls) at warn.
fn default_directives(level: &str) -> String {
    let level = parse_level(level).to_string().to_lowercase();
    format!("warn,{CRATE_TARGET}={level}")
}

fn file_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn console_targets(level: Level) -> Targets {
    Targets::new().with_target(CRATE_TARGET, level)
}

/// Install the global subscriber: the log file at the configured level and
/// stderr for feeder warnings and errors.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if let Some(parent) = Path::new(&config.file).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false)
                .with_target(true)
                .with_filter(file_filter(&config.level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_filter(console_targets(Level::WARN)),
        )
        .init();

    Ok(())
}

/// Console-only logging, used when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false)
                .with_filter(file_filter(level)),
        )
        .init();
}
