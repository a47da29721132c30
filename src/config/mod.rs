//! Configuration management.
//!
//! Settings come from three layers, later layers winning:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `HIDDENTHREAD_CONFIG_PATH`, or the platform
//!    config dir)
//! 3. `HIDDENTHREAD_*` environment variables
//!
//! ```toml
//! [matching]
//! top_k = 5
//! similarity_threshold = 0.3
//! index = "flat"
//!
//! [llm]
//! model = "tngtech/deepseek-r1t2-chimera:free"
//! api_key = "${OPENROUTER_API_KEY}"
//!
//! [logging]
//! format = "json"
//! ```

use crate::storage::IndexKind;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "HIDDENTHREAD_CONFIG_PATH";

/// Main configuration for hiddenthread.
#[derive(Debug, Clone, Default)]
pub struct HiddenThreadConfig {
    /// Similarity matching settings.
    pub matching: MatchingConfig,
    /// LLM provider settings.
    pub llm: LlmConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Similarity matching settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Embedding width the index is built for.
    pub dimensions: usize,
    /// Maximum hits per query.
    ///
    /// The query's own entry is always its top hit and takes one of these
    /// slots, so a need reaches at most `top_k - 1` availabilities.
    pub top_k: usize,
    /// Hits must score strictly above this.
    pub similarity_threshold: f32,
    /// Index backend.
    pub index: IndexKind,
    /// Upper bound on suggestion calls in flight at once.
    pub max_concurrent_suggestions: usize,
    /// Drop repeated `(need, availability)` position pairs.
    pub dedup: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            dimensions: crate::embedding::DEFAULT_DIMENSIONS,
            top_k: 5,
            similarity_threshold: 0.3,
            index: IndexKind::Flat,
            max_concurrent_suggestions: 4,
            dedup: false,
        }
    }
}

impl MatchingConfig {
    /// Sets the embedding width.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Sets the per-query hit limit.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets the similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Sets the index backend.
    #[must_use]
    pub const fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    /// Sets the suggestion concurrency limit.
    #[must_use]
    pub const fn with_max_concurrent_suggestions(mut self, max: usize) -> Self {
        self.max_concurrent_suggestions = max;
        self
    }

    /// Enables or disables pair deduplication.
    #[must_use]
    pub const fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// Checks the settings for values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for zero dimensions, a non-finite
    /// threshold, or a zero concurrency limit.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(Error::Configuration(
                "matching.dimensions must be greater than zero".to_string(),
            ));
        }
        if !self.similarity_threshold.is_finite() {
            return Err(Error::Configuration(
                "matching.similarity_threshold must be a finite number".to_string(),
            ));
        }
        if self.max_concurrent_suggestions == 0 {
            return Err(Error::Configuration(
                "matching.max_concurrent_suggestions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// LLM provider configuration.
///
/// Unset optional fields fall back to the defaults of
/// [`LlmHttpConfig`](crate::llm::LlmHttpConfig) and
/// [`LlmResilienceConfig`](crate::llm::LlmResilienceConfig).
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// OpenAI-compatible endpoint base URL.
    pub endpoint: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<SecretString>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Retries for timed-out calls.
    pub max_retries: Option<u32>,
    /// Backoff between retries in milliseconds.
    pub retry_backoff_ms: Option<u64>,
    /// Consecutive failures before the circuit opens.
    pub breaker_failure_threshold: Option<u32>,
    /// How long the circuit stays open in milliseconds.
    pub breaker_reset_ms: Option<u64>,
    /// Trial calls allowed while half-open.
    pub breaker_half_open_max_calls: Option<u32>,
}

impl LlmConfig {
    /// Returns the API key, failing when none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the key is missing or blank.
    pub fn require_api_key(&self) -> Result<&SecretString> {
        self.api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(
                    "missing LLM API key: set llm.api_key, HIDDENTHREAD_LLM_API_KEY or \
                     OPENROUTER_API_KEY"
                        .to_string(),
                )
            })
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. `hiddenthread=debug`.
    pub filter: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

// ============================================================================
// File format
// ============================================================================

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Matching section.
    pub matching: Option<ConfigFileMatching>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Matching section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileMatching {
    /// Embedding width.
    pub dimensions: Option<usize>,
    /// Per-query hit limit.
    pub top_k: Option<usize>,
    /// Similarity threshold.
    pub similarity_threshold: Option<f32>,
    /// `flat` or `hnsw`.
    pub index: Option<String>,
    /// Suggestion concurrency limit.
    pub max_concurrent_suggestions: Option<usize>,
    /// Pair deduplication.
    pub dedup: Option<bool>,
}

/// LLM section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileLlm {
    /// Endpoint base URL.
    pub endpoint: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// API key, or a `${VAR}` reference to one.
    pub api_key: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
    /// Retries for timeouts.
    pub max_retries: Option<u32>,
    /// Retry backoff.
    pub retry_backoff_ms: Option<u64>,
    /// Breaker failure threshold.
    pub breaker_failure_threshold: Option<u32>,
    /// Breaker reset timeout.
    pub breaker_reset_ms: Option<u64>,
    /// Breaker half-open trial calls.
    pub breaker_half_open_max_calls: Option<u32>,
}

/// Logging section in config file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Placeholder written instead of secrets when a config is displayed.
const REDACTED: &str = "***REDACTED***";

impl HiddenThreadConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid config TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/hiddenthread/` on macOS)
    /// 2. XDG config dir (`~/.config/hiddenthread/`)
    ///
    /// Returns default configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("hiddenthread").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("hiddenthread")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `HiddenThreadConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(matching) = file.matching {
            let m = &mut config.matching;
            if let Some(v) = matching.dimensions {
                m.dimensions = v;
            }
            if let Some(v) = matching.top_k {
                m.top_k = v;
            }
            if let Some(v) = matching.similarity_threshold {
                m.similarity_threshold = v;
            }
            if let Some(v) = matching.index {
                m.index = v.parse()?;
            }
            if let Some(v) = matching.max_concurrent_suggestions {
                m.max_concurrent_suggestions = v;
            }
            if let Some(v) = matching.dedup {
                m.dedup = v;
            }
        }

        if let Some(llm) = file.llm {
            config.llm = LlmConfig {
                endpoint: llm.endpoint,
                model: llm.model,
                api_key: llm
                    .api_key
                    .as_deref()
                    .and_then(expand_env_reference)
                    .map(SecretString::from),
                timeout_ms: llm.timeout_ms,
                connect_timeout_ms: llm.connect_timeout_ms,
                max_retries: llm.max_retries,
                retry_backoff_ms: llm.retry_backoff_ms,
                breaker_failure_threshold: llm.breaker_failure_threshold,
                breaker_reset_ms: llm.breaker_reset_ms,
                breaker_half_open_max_calls: llm.breaker_half_open_max_calls,
            };
        }

        if let Some(logging) = file.logging {
            config.logging = LoggingSettings {
                format: logging.format,
                filter: logging.filter,
                file: logging.file.map(PathBuf::from),
            };
        }

        Ok(config)
    }

    /// Applies `HIDDENTHREAD_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides using `lookup` in place of the process environment.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let m = &mut self.matching;
        override_parsed(&lookup, "HIDDENTHREAD_SIMILARITY_THRESHOLD", &mut m.similarity_threshold);
        override_parsed(&lookup, "HIDDENTHREAD_TOP_K", &mut m.top_k);
        override_parsed(&lookup, "HIDDENTHREAD_DIMENSIONS", &mut m.dimensions);
        override_parsed(&lookup, "HIDDENTHREAD_INDEX", &mut m.index);
        override_parsed(
            &lookup,
            "HIDDENTHREAD_MAX_CONCURRENT_SUGGESTIONS",
            &mut m.max_concurrent_suggestions,
        );

        let llm = &mut self.llm;
        if let Some(key) = lookup("HIDDENTHREAD_LLM_API_KEY").or_else(|| lookup("OPENROUTER_API_KEY"))
        {
            llm.api_key = Some(SecretString::from(key));
        }
        if let Some(endpoint) = lookup("HIDDENTHREAD_LLM_ENDPOINT") {
            llm.endpoint = Some(endpoint);
        }
        if let Some(model) = lookup("HIDDENTHREAD_LLM_MODEL") {
            llm.model = Some(model);
        }
        override_optional(&lookup, "HIDDENTHREAD_LLM_TIMEOUT_MS", &mut llm.timeout_ms);
        override_optional(
            &lookup,
            "HIDDENTHREAD_LLM_CONNECT_TIMEOUT_MS",
            &mut llm.connect_timeout_ms,
        );
        override_optional(&lookup, "HIDDENTHREAD_LLM_MAX_RETRIES", &mut llm.max_retries);

        if let Some(format) = lookup("HIDDENTHREAD_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(file) = lookup("HIDDENTHREAD_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }

        self
    }

    /// Renders the effective configuration as TOML with secrets redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let m = &self.matching;
        let file = ConfigFile {
            matching: Some(ConfigFileMatching {
                dimensions: Some(m.dimensions),
                top_k: Some(m.top_k),
                similarity_threshold: Some(m.similarity_threshold),
                index: Some(m.index.to_string()),
                max_concurrent_suggestions: Some(m.max_concurrent_suggestions),
                dedup: Some(m.dedup),
            }),
            llm: Some(ConfigFileLlm {
                endpoint: self.llm.endpoint.clone(),
                model: self.llm.model.clone(),
                api_key: self.llm.api_key.as_ref().map(|_| REDACTED.to_string()),
                timeout_ms: self.llm.timeout_ms,
                connect_timeout_ms: self.llm.connect_timeout_ms,
                max_retries: self.llm.max_retries,
                retry_backoff_ms: self.llm.retry_backoff_ms,
                breaker_failure_threshold: self.llm.breaker_failure_threshold,
                breaker_reset_ms: self.llm.breaker_reset_ms,
                breaker_half_open_max_calls: self.llm.breaker_half_open_max_calls,
            }),
            logging: Some(ConfigFileLogging {
                format: self.logging.format.clone(),
                filter: self.logging.filter.clone(),
                file: self
                    .logging
                    .file
                    .as_ref()
                    .map(|p| p.display().to_string()),
            }),
        };

        toml::to_string_pretty(&file).map_err(|e| Error::OperationFailed {
            operation: "serialize_config".to_string(),
            cause: e.to_string(),
        })
    }
}

/// Resolves `${VAR}` to the variable's value; other strings pass through.
///
/// Returns `None` for an unset variable.
fn expand_env_reference(value: &str) -> Option<String> {
    let trimmed = value.trim();
    match trimmed.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var) => std::env::var(var).ok(),
        None => Some(trimmed.to_string()),
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparseable environment override"),
    }
}

fn override_optional<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut Option<T>,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = Some(value),
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparseable environment override"),
    }
}
