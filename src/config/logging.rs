//! Logging configuration and tracing subscriber setup

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use super::error::ValidationError;

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, used when `RUST_LOG` is unset
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    /// Deployment environment name
    pub environment: Environment,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl LoggingConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Validate logging configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        EnvFilter::try_new(&self.filter)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidLogFilter(e.to_string()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,membership_engine=debug".to_string(),
            json: false,
            environment: Environment::Development,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter. Installing twice is not an
/// error; the first subscriber stays.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ValidationError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| ValidationError::InvalidLogFilter(e.to_string()))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}
