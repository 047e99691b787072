//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging with optional file output.
//! The library itself only emits `tracing` events; embedders that do not
//! install their own subscriber can call [`init_logging`] once at startup.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging based on configuration.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid, the log file cannot
/// be opened, or a global subscriber has already been installed.
///
/// # Examples
///
/// ```no_run
/// use authtabs::config::LoggingConfig;
/// use authtabs::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let file = match &config.file_path {
        Some(path) => Some(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    if config.json_format {
        let stdout_layer = fmt::layer().json().with_current_span(true);

        if let Some(file) = file {
            let file_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(file);
            registry.with(stdout_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stdout_layer).try_init()?;
        }
    } else {
        let stdout_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true);

        if let Some(file) = file {
            let file_layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(file);
            registry.with(stdout_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stdout_layer).try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_rejects_bad_directive() {
        // Only meaningful when RUST_LOG does not override the directive.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "authtabs=loud".to_string(),
            json_format: false,
            file_path: None,
        };
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_init_logging_with_file_twice_fails_second_time() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            json_format: true,
            file_path: Some(dir.path().join("authtabs.log")),
        };

        // Another test in this binary may already own the global subscriber,
        // so only the second call's outcome is deterministic.
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
        assert!(dir.path().join("authtabs.log").exists());
    }
}
