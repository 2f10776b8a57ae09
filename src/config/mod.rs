//! Application configuration module
//!
//! Type-safe configuration loaded with the `config` and `dotenvy` crates.
//! Sources, later ones overriding earlier ones:
//!
//! 1. Built-in defaults (every section is optional)
//! 2. `config/membership.{toml,yaml,json}` if present
//! 3. Environment variables with the `MEMBERSHIP_ENGINE` prefix, nested
//!    with `__`
//!
//! # Example
//!
//! ```no_run
//! use membership_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Lock timeout: {}ms", config.engine.lock_timeout_ms);
//! ```

mod catalog;
mod engine;
mod error;
mod features;
mod logging;

pub use catalog::CatalogConfig;
pub use engine::EngineConfig;
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use logging::{init_tracing, Environment, LoggingConfig};

use serde::Deserialize;
use std::path::Path;

const ENV_PREFIX: &str = "MEMBERSHIP_ENGINE";
const DEFAULT_CONFIG_FILE: &str = "config/membership";

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Scheduling, concurrency and limits
    #[serde(default)]
    pub engine: EngineConfig,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,

    /// Plan and tier seed for the static catalog source
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the default file and environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `MEMBERSHIP_ENGINE__ENGINE__LOCK_TIMEOUT_MS=250` -> `engine.lock_timeout_ms = 250`
    /// - `MEMBERSHIP_ENGINE__FEATURES__ENABLE_EAGER_UPGRADES=false`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or a value cannot be
    /// parsed into its expected type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from an explicit file; environment variables still override it.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX).separator("__")
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for zero sizes or intervals, an order window
    /// longer than retention, an unusable catalog, or a bad log filter.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.engine.validate()?;
        self.catalog.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Load and validate in one step.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }
}
