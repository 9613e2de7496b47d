//! Summary of matched tile files, written as `tile_list_{SITES}.csv`.

use crate::matcher::MatchedFile;
use crate::product::{DateWindow, ProductId};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Separator between plot IDs in the `plotIDs` column.
pub const PLOT_ID_SEPARATOR: &str = ";";

/// One matched tile file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    /// Site code.
    pub site: String,
    /// Product ID.
    pub product: String,
    /// Month the file was published for.
    pub window: DateWindow,
    /// File name.
    pub filename: String,
    /// Download URL.
    pub url: String,
    /// Plots covered by the file's tile.
    pub plot_ids: Vec<String>,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    filename: &'a str,
    url: &'a str,
    plot_ids: String,
}

/// Matched files accumulated over a fetch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TileListing {
    sites: Vec<String>,
    rows: Vec<ListingRow>,
    failed_downloads: usize,
}

impl TileListing {
    /// Create an empty listing for the requested sites.
    pub fn new(sites: &[String]) -> Self {
        Self {
            sites: sites.to_vec(),
            ..Default::default()
        }
    }

    /// Append the matches of one site, product, and month.
    pub fn extend<I>(&mut self, site: &str, product: &ProductId, window: DateWindow, matches: I)
    where
        I: IntoIterator<Item = MatchedFile>,
    {
        self.rows.extend(matches.into_iter().map(|m| ListingRow {
            site: site.to_string(),
            product: product.to_string(),
            window,
            filename: m.name,
            url: m.url,
            plot_ids: m.plot_ids,
        }));
    }

    /// Record a batch whose download failed.
    pub fn record_failed_download(&mut self) {
        self.failed_downloads += 1;
    }

    /// Number of download batches that failed.
    pub fn failed_downloads(&self) -> usize {
        self.failed_downloads
    }

    /// Matched files, in the order they were found.
    pub fn rows(&self) -> &[ListingRow] {
        &self.rows
    }

    /// Number of matched files.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// File name for this listing: `tile_list_{SITE1_SITE2}.csv`.
    pub fn file_name(&self) -> String {
        format!("tile_list_{}.csv", self.sites.join("_"))
    }

    /// Write the listing as CSV into `dir` and return the file path.
    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf, csv::Error> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&path)?;
        // Empty listings still get a header row.
        writer.write_record(["filename", "url", "plotIDs"])?;
        for row in &self.rows {
            writer.serialize(CsvRow {
                filename: &row.filename,
                url: &row.url,
                plot_ids: row.plot_ids.join(PLOT_ID_SEPARATOR),
            })?;
        }
        writer.flush()?;
        Ok(path)
    }
}
