//! Error types for the depscout CLI.
//!
//! Analysis failures keep their [`depscout::AnalyzeError`] diagnostic so that
//! miette renders the library's codes and help text unchanged.

use std::path::PathBuf;

use depscout::AnalyzeError;
use miette::Report;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The analysis itself failed
    #[error(transparent)]
    Analysis(#[from] AnalyzeError),

    /// Writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--config` names a file that does not exist
    #[error("Config file not found: {}\n\nHint: Create depscout.json or pass an existing file to --config", .0.display())]
    NotFound(PathBuf),

    /// A layer could not be merged or extracted
    #[error("Invalid configuration: {0}\n\nHint: Check depscout.json syntax and DEPSCOUT_* variables")]
    Extract(String),

    /// A field holds a value the analyzer cannot use
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Extract(err.to_string())
    }
}

/// Convert a CLI error into a miette report.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Analysis(e) => Report::new(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        other => miette::miette!("{}", other),
    }
}
