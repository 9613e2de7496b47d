//! Error types for the runner.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a runner command.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("Failed to parse config {path}: {source}")]
    Config {
        /// Config file path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// A configuration value is out of range.
    #[error("Invalid config value for {field}: {reason}")]
    InvalidConfig {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The plot table could not be loaded.
    #[error(transparent)]
    Plots(#[from] neonaop_tiles::PlotError),

    /// A portal request, download, or extraction failed.
    #[error(transparent)]
    Api(#[from] neonaop_api::ApiError),

    /// The tile list could not be written.
    #[error("Failed to write tile list: {0}")]
    Csv(#[from] csv::Error),

    /// Output could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A fetch was rejected before any request was made.
    #[error("{0} rejected; see the log for details")]
    Rejected(&'static str),
}

impl From<neonaop_api::CatalogError> for RunnerError {
    fn from(e: neonaop_api::CatalogError) -> Self {
        RunnerError::Api(e.into())
    }
}

impl From<neonaop_api::DownloadError> for RunnerError {
    fn from(e: neonaop_api::DownloadError) -> Self {
        RunnerError::Api(e.into())
    }
}

impl From<neonaop_api::ValidationError> for RunnerError {
    fn from(e: neonaop_api::ValidationError) -> Self {
        RunnerError::Api(e.into())
    }
}
