//! Error types for plot loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching or reading the plot polygon table.
#[derive(Debug, Error)]
pub enum PlotError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error when fetching the plot archive.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The server answered the archive request with a non-success status.
    #[error("Failed to download plot archive from {url}: {reason}")]
    DownloadFailed {
        /// Requested URL.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The downloaded archive could not be read.
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The CSV plot table could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The shapefile attribute table could not be parsed.
    #[error("dBase error: {0}")]
    Dbase(#[from] shapefile::dbase::Error),

    /// The extracted archive has no polygon attribute table.
    #[error("No plot attribute table found under {0}")]
    TableNotFound(PathBuf),

    /// A table has an extension other than `.dbf` or `.csv`.
    #[error("Unsupported plot table format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A required field is missing or empty in a table row.
    #[error("Row {row}: missing field '{field}'")]
    MissingField {
        /// Zero-based row index.
        row: usize,
        /// Field name.
        field: &'static str,
    },

    /// A coordinate field holds something other than a number.
    #[error("Row {row}: field '{field}' is not numeric: {value}")]
    InvalidCoordinate {
        /// Zero-based row index.
        row: usize,
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}
