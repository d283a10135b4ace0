//! Telemetry initialisation primitives and logging configuration.
//!
//! # Design
//! - Centralises logging setup (pretty or JSON) behind a single entry point.
//! - Records the build identifier once so every module logs the same value.
//! - `RUST_LOG` always wins over the configured level.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};
use crate::sink::LogSink;

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Environment variable that forces the log format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "HTTPBACKUP_LOG_FORMAT";
/// Environment variable naming a file that mirrors log output.
pub const LOG_FILE_ENV: &str = "HTTPBACKUP_LOG_FILE";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or the subscriber cannot be
/// installed (for example, because another subscriber has already been set).
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let _ = BUILD_SHA.set(config.build_sha.to_string());

    let sink = match &config.log_file {
        Some(path) => LogSink::with_file(path)?,
        None => LogSink::stdout(),
    };
    let filter = build_env_filter(config.level);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(sink),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(sink),
            )
            .try_init(),
    };
    installed.map_err(|source| TelemetryError::SubscriberInstall { source })
}

/// Access the build identifier recorded during logging initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

fn build_env_filter(level: &str) -> EnvFilter {
    env_filter_from(
        std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        level,
    )
}

fn env_filter_from(directives: Option<&str>, level: &str) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Build identifier recorded in structured logs.
    pub build_sha: &'a str,
    /// File that receives a copy of every log line.
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
            log_file: None,
        }
    }
}

impl LoggingConfig<'_> {
    /// Apply `HTTPBACKUP_LOG_FORMAT` and `HTTPBACKUP_LOG_FILE` on top of `self`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(LOG_FORMAT_ENV).ok().as_deref(),
            std::env::var(LOG_FILE_ENV).ok().as_deref(),
        )
    }

    fn with_overrides(mut self, format: Option<&str>, file: Option<&str>) -> Self {
        if let Some(format) = format.and_then(LogFormat::parse) {
            self.format = format;
        }
        if let Some(file) = file.map(str::trim) {
            self.log_file = if file.is_empty() {
                None
            } else {
                Some(PathBuf::from(file))
            };
        }
        self
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable logs.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Parse `json` or `pretty` (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}
