//! Logging configuration and setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{TelemetryError, TelemetryResult};

fn init_err<E: std::fmt::Display>(e: E) -> TelemetryError {
    TelemetryError::InitError(e.to_string())
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable format.
    Pretty,
    /// Compact single-line format (default).
    #[default]
    Compact,
    /// JSON format for structured logging.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Log output target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stdout.
    Stdout,
    /// Log to stderr.
    #[default]
    Stderr,
    /// Log to daily-rotated files in a directory.
    File {
        /// Directory to write log files to.
        directory: PathBuf,
        /// File name prefix.
        prefix: String,
    },
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
    /// Log target.
    #[serde(default)]
    pub target: LogTarget,
    /// Whether to include timestamps.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Whether to use ANSI colors.
    #[serde(default = "default_true")]
    pub ansi: bool,
    /// Directive overrides (e.g., `consent_ledger=debug`).
    #[serde(default)]
    pub directives: Vec<String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            timestamps: true,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Create a new log config with the specified level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Set the log format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        if matches!(target, LogTarget::File { .. }) {
            self.ansi = false;
        }
        self.target = target;
        self
    }

    /// Add a directive override.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Disable timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Build the env filter from config.
    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::ConfigError(e.to_string()))?;

        for directive in &self.directives {
            filter = filter.add_directive(directive.parse().map_err(
                |e: tracing_subscriber::filter::ParseError| {
                    TelemetryError::ConfigError(e.to_string())
                },
            )?);
        }

        Ok(filter)
    }
}

/// Set up the global subscriber with the given configuration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a global subscriber
/// is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;

    match &config.target {
        LogTarget::Stdout => install(filter, config, std::io::stdout),
        LogTarget::Stderr => install(filter, config, std::io::stderr),
        LogTarget::File { directory, prefix } => {
            std::fs::create_dir_all(directory).map_err(|e| {
                TelemetryError::ConfigError(format!("failed to create log directory: {e}"))
            })?;
            let appender = RollingFileAppender::new(Rotation::DAILY, directory, prefix);
            install(filter, config, appender)
        },
    }
}

fn install<W>(filter: EnvFilter, config: &LogConfig, writer: W) -> TelemetryResult<()>
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    let base = fmt::layer().with_writer(writer).with_ansi(config.ansi);

    match (config.format, config.timestamps) {
        (LogFormat::Json, true) => registry.with(base.json()).try_init(),
        (LogFormat::Json, false) => registry.with(base.json().without_time()).try_init(),
        (LogFormat::Pretty, true) => registry.with(base.pretty()).try_init(),
        (LogFormat::Pretty, false) => registry.with(base.pretty().without_time()).try_init(),
        (LogFormat::Compact, true) => registry.with(base.compact()).try_init(),
        (LogFormat::Compact, false) => registry.with(base.compact().without_time()).try_init(),
    }
    .map_err(init_err)
}
