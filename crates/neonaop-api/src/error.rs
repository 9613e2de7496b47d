//! Error types for the NEON API crate.

use std::path::PathBuf;
use thiserror::Error;

/// Input rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Product ID does not match `DP#.#####.001`.
    #[error("{0} is not of the correct format. The correct format is DP#.#####.001")]
    InvalidProductId(String),

    /// Remote sensing products are fetched by tile, not by product.
    #[error("{0} is a remote sensing data product. Use the AOP tile fetch instead.")]
    RemoteSensingProduct(String),

    /// Phenocam images are not hosted by the NEON data portal.
    #[error("{0} is a phenological image product, data are hosted by Phenocam.")]
    PhenocamProduct(String),

    /// Package must be `basic` or `expanded`.
    #[error("{0} is not a valid package name. Package must be basic or expanded")]
    InvalidPackage(String),

    /// A date range was given with no dates in it.
    #[error("date range must contain at least one YYYY-MM month, e.g. ['2019-10', '2020-10']")]
    EmptyDateRange,

    /// A month is not of the form `YYYY-MM`.
    #[error("{0} is not a valid month. Months must be of the form YYYY-MM")]
    InvalidDateWindow(String),
}

/// Failure talking to the data portal catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request error.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The portal answered with a non-success status.
    #[error("Request to {url} failed with HTTP {status}: {detail}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail reported by the portal, if any.
        detail: String,
    },

    /// The response body was not the expected JSON.
    #[error("Failed to parse response from {url}: {source}")]
    Parse {
        /// Requested URL.
        url: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The site does not offer the product.
    #[error("{product} is not available for site {site}")]
    ProductNotAtSite {
        /// Product ID.
        product: String,
        /// Site code.
        site: String,
    },
}

/// Failure in a download strategy.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// I/O error writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The file server answered with a non-success status.
    #[error("Failed to download {file}: HTTP {status}")]
    Status {
        /// File name.
        file: String,
        /// HTTP status code.
        status: u16,
    },

    /// The strategy needs a username and none was given.
    #[error("{0} requires a username")]
    MissingCredentials(&'static str),

    /// The external transfer tool could not be started.
    #[error("Failed to run {command}: {source}")]
    Spawn {
        /// Command name.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The external transfer tool exited with a failure status.
    #[error("{command} failed for {file} ({status})")]
    Transfer {
        /// Command name.
        command: String,
        /// File being transferred.
        file: String,
        /// Exit status description.
        status: String,
    },
}

/// Failure extracting archives or reading tables.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive could not be read.
    #[error("Zip archive error in {path}: {source}")]
    Zip {
        /// Archive path.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },

    /// CSV table could not be parsed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Table path.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

/// Any error raised by this crate.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation error.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Catalog error.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Download error.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Archive error.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
