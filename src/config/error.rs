//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("order_window_months ({window}) exceeds activity_retention_months ({retention})")]
    OrderWindowExceedsRetention { window: u32, retention: u32 },

    #[error("Catalog has no {0}")]
    EmptyCatalog(&'static str),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid log filter directive: {0}")]
    InvalidLogFilter(String),
}
