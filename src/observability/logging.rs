//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor config sets one.
const DEFAULT_FILTER: &str = "hiddenthread=info,warn";

/// Default filter with `--verbose`.
const VERBOSE_FILTER: &str = "hiddenthread=debug,info";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, defaulting to `Pretty` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the logging configuration.
    ///
    /// `RUST_LOG` takes precedence over the configured filter; `verbose`
    /// only changes the fallback.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let fallback = settings.filter.as_deref().unwrap_or(if verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        });

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(fallback))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        Self {
            format: settings
                .format
                .as_deref()
                .map_or(LogFormat::Pretty, LogFormat::parse),
            filter,
            file: settings.file.clone(),
        }
    }
}
