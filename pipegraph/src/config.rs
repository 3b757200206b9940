//! Runtime settings for pipelines and logging.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{PipegraphError, Result};

/// Environment variable overriding [`PipelineSettings::staging_root`].
pub const ENV_STAGING_ROOT: &str = "PIPEGRAPH_STAGING_ROOT";
/// Environment variable overriding [`PipelineSettings::log_filter`].
pub const ENV_LOG: &str = "PIPEGRAPH_LOG";
/// Environment variable overriding [`PipelineSettings::log_format`].
pub const ENV_LOG_FORMAT: &str = "PIPEGRAPH_LOG_FORMAT";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = PipegraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(PipegraphError::Configuration(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Settings shared by pipelines built in one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Staging root. Relative paths are resolved against the working directory.
    #[serde(default = "default_staging_root")]
    pub staging_root: PathBuf,
    /// `tracing_subscriber` filter directive.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_staging_root() -> PathBuf {
    PathBuf::from(".workflow")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            staging_root: default_staging_root(),
            log_filter: default_log_filter(),
            log_format: LogFormat::default(),
        }
    }
}

impl PipelineSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the staging root.
    #[must_use]
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = root.into();
        self
    }

    /// Sets the log filter.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Sets the log format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Defaults overridden by `PIPEGRAPH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an unknown log format.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(root) = lookup(ENV_STAGING_ROOT).filter(|s| !s.is_empty()) {
            settings.staging_root = PathBuf::from(root);
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|s| !s.is_empty()) {
            settings.log_filter = filter;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            settings.log_format = format.parse()?;
        }
        Ok(settings)
    }
}
