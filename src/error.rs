//! Error types for devicegate
//!
//! Startup faults (configuration, suite manifest, metrics registry) are
//! reported through [`AppError`]. Problems with a single candidate during
//! selection are diagnostics, not errors, and never surface here.

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Failed to read suite manifest {path}: {source}")]
    ManifestFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse suite manifest {path}: {source}")]
    ManifestParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid suite manifest: {0}")]
    ManifestInvalid(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to write output: {0}")]
    Output(String),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
