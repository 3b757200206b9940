//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from [`PipelineSettings::log_filter`] (itself overridable
//! with `PIPEGRAPH_LOG`). Logs go to stderr so that plugin stdout stays clean.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, PipelineSettings};
use crate::errors::{PipegraphError, Result};

/// Installs the global subscriber.
///
/// Returns `Ok(false)` if a subscriber was already installed.
///
/// # Errors
///
/// Returns `Configuration` if the filter directive does not parse.
pub fn init_logging(settings: &PipelineSettings) -> Result<bool> {
    let filter = EnvFilter::try_new(&settings.log_filter).map_err(|e| {
        PipegraphError::Configuration(format!(
            "invalid log filter '{}': {e}",
            settings.log_filter
        ))
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter() {
        let settings = PipelineSettings::new().with_log_filter("pipegraph=loud");
        assert!(matches!(
            init_logging(&settings),
            Err(PipegraphError::Configuration(_))
        ));
    }

    #[test]
    fn test_second_init_is_not_an_error() {
        let settings = PipelineSettings::new().with_log_filter("warn");
        let _ = init_logging(&settings).unwrap();
        assert!(!init_logging(&settings).unwrap());
    }
}
