//! Logging setup using tracing.
//!
//! The external editor owns the terminal while an entry is being edited, so
//! logs go to a file by default and only reach stderr when asked for.

use crate::{Error, ErrorKind, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a log level from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Filter directive scoping the level to the daybook crates.
    fn directive(&self) -> String {
        let level = self.as_str();
        format!(
            "daybook={level},daybook_core={level},daybook_revision={level},daybook_util={level}"
        )
    }
}

/// Logging configuration.
pub struct LogConfig {
    /// Whether to print logs to stderr instead of the log file.
    pub print: bool,
    /// Log level.
    pub level: LogLevel,
    /// Whether to include file/line info in logs.
    pub include_location: bool,
    /// Log file path (if any).
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            print: false,
            level: LogLevel::Info,
            include_location: false,
            file: default_log_path(),
        }
    }
}

/// Initialize logging with the given configuration.
///
/// This should be called once at application startup. Returns the log file
/// in use, if any. `RUST_LOG` overrides the configured level.
pub fn init(config: LogConfig) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directive()));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.print {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        subscriber
            .with(fmt_layer)
            .try_init()
            .map_err(already_initialized)?;
        return Ok(None);
    }

    let Some(path) = config.file else {
        // Spans still work, events go nowhere
        subscriber
            .try_init()
            .map_err(already_initialized)?;
        return Ok(None);
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            Error::with_source(
                ErrorKind::Io,
                format!("could not open log file {}", path.display()),
                e,
            )
        })?;

    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    subscriber
        .with(fmt_layer)
        .try_init()
        .map_err(already_initialized)?;

    Ok(Some(path))
}

fn already_initialized(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::with_source(ErrorKind::LoggingInitialized, "logging already initialized", e)
}

/// Get the default log file path.
pub fn default_log_path() -> Option<PathBuf> {
    crate::path::logs_dir().map(|p| p.join("daybook.log"))
}
