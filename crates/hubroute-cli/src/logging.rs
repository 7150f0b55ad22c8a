//! Logging setup for the CLI.
//!
//! - [`LoggingConfig`]: format and level
//! - [`init_logging`]: install the tracing subscriber
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: `text` (default) or `json`
//! - `RUST_LOG`: log level filter (default: `warn`)
//!
//! Logs always go to stderr so stdout stays machine-readable.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text (default for interactive use).
    #[default]
    Text,
    /// JSON lines, one object per event.
    Json,
}

impl LogFormat {
    /// Parse a log format name.
    ///
    /// Accepts "json", "text" or "pretty" (alias for text). Anything else is text.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level filter used when `RUST_LOG` is unset (e.g. "info", "debug").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create configuration from `LOG_FORMAT` and `RUST_LOG`.
    pub fn from_env() -> Self {
        let format = std::env::var("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();
        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
        Self { format, level }
    }

    /// Raise the default level to `debug`, e.g. for `--verbose`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        self
    }
}

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    let _ = match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
}
