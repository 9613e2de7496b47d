//! TOS plot polygon table: download, extraction, and loading.
//!
//! NEON publishes every Terrestrial Observation System plot as a polygon
//! shapefile inside a zip archive. Only the attribute table is needed here:
//! each row carries the plot's site, subtype, identifier, and the UTM
//! coordinates of its centroid.
//!
//! Source: https://data.neonscience.org/api/v0/documents/All_NEON_TOS_Plots_V8

use crate::select::{select_plots_with_grid, PlotRecord, Selection};
use crate::tile::TileGrid;
use crate::{PlotError, Result};
use serde::Deserialize;
use shapefile::dbase::{self, FieldValue};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Document name of the plot polygon archive.
pub const PLOTS_DOCUMENT: &str = "All_NEON_TOS_Plots_V8";

/// URL of the plot polygon archive.
pub const DEFAULT_PLOTS_URL: &str = "https://data.neonscience.org/api/v0/documents/All_NEON_TOS_Plots_V8";

/// Subtype of the plots that anchor AOP tile selection.
pub const BASE_PLOT_SUBTYPE: &str = "basePlot";

/// Attribute table path inside the extracted archive.
const POLYGON_TABLE: &str = "All_NEON_TOS_Plots_V8/All_NEON_TOS_Plot_Polygons_V8.dbf";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One row of the plot attribute table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotRow {
    /// Four-letter site code, e.g. `BART`.
    #[serde(rename = "siteID")]
    pub site_id: String,
    /// Plot subtype, e.g. `basePlot` or `tickPlot`.
    pub subtype: String,
    /// Plot identifier, e.g. `BART_001`.
    #[serde(rename = "plotID")]
    pub plot_id: String,
    /// UTM easting of the centroid.
    pub easting: f64,
    /// UTM northing of the centroid.
    pub northing: f64,
}

impl PlotRow {
    /// Reduce the row to the fields used for tile selection.
    pub fn to_record(&self) -> PlotRecord {
        PlotRecord::new(self.plot_id.clone(), self.easting, self.northing)
    }
}

/// Row filter applied when extracting plots for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotFilter {
    /// Site code to keep.
    pub site_id: String,
    /// Subtype to keep.
    pub subtype: String,
}

impl PlotFilter {
    /// Base plots of a site.
    pub fn base_plots(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            subtype: BASE_PLOT_SUBTYPE.to_string(),
        }
    }

    /// Check if a row passes the filter.
    pub fn matches(&self, row: &PlotRow) -> bool {
        row.site_id == self.site_id && row.subtype == self.subtype
    }
}

/// The full plot attribute table.
#[derive(Debug, Clone, Default)]
pub struct PlotTable {
    rows: Vec<PlotRow>,
}

impl PlotTable {
    /// Create a table from rows.
    pub fn new(rows: Vec<PlotRow>) -> Self {
        Self { rows }
    }

    /// Load a table from a `.dbf` attribute table or a `.csv` export.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("dbf") => Self::from_dbf(path),
            Some("csv") => Self::from_csv(fs::File::open(path)?),
            _ => Err(PlotError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Read the shapefile's dBase attribute table.
    pub fn from_dbf<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = dbase::Reader::from_path(path.as_ref())?;
        let records = reader.read()?;
        let rows = records
            .iter()
            .enumerate()
            .map(|(i, record)| row_from_fields(i, |name| record.get(name)))
            .collect::<Result<Vec<_>>>()?;
        debug!(path = %path.as_ref().display(), rows = rows.len(), "Loaded plot attribute table");
        Ok(Self { rows })
    }

    /// Read a CSV export with `siteID,subtype,plotID,easting,northing` columns.
    ///
    /// Additional columns are ignored.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let rows = csv_reader
            .deserialize()
            .collect::<std::result::Result<Vec<PlotRow>, _>>()?;
        Ok(Self { rows })
    }

    /// All rows.
    pub fn rows(&self) -> &[PlotRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plots that pass the filter, in table order.
    pub fn plots(&self, filter: &PlotFilter) -> Vec<PlotRecord> {
        self.rows
            .iter()
            .filter(|row| filter.matches(row))
            .map(PlotRow::to_record)
            .collect()
    }

    /// Select the plots of each site and group them by tile.
    ///
    /// Every requested site gets an entry; a site with no rows of the given
    /// subtype maps to an empty selection.
    pub fn select_sites<S: AsRef<str>>(
        &self,
        sites: &[S],
        subtype: &str,
        grid: &TileGrid,
        cull_boundary: bool,
    ) -> BTreeMap<String, Selection> {
        sites
            .iter()
            .map(|site| {
                let filter = PlotFilter {
                    site_id: site.as_ref().to_string(),
                    subtype: subtype.to_string(),
                };
                let plots = self.plots(&filter);
                if plots.is_empty() {
                    warn!(site = %filter.site_id, subtype = %subtype, "No plots found for site");
                }
                let selection = select_plots_with_grid(grid, &plots, cull_boundary);
                info!(
                    site = %filter.site_id,
                    plots = plots.len(),
                    tiles = selection.groups().len(),
                    culled = selection.culled(),
                    "Selected tiles for site"
                );
                (filter.site_id, selection)
            })
            .collect()
    }
}

/// Build a row from a field lookup.
fn row_from_fields<'a, F>(row: usize, lookup: F) -> Result<PlotRow>
where
    F: Fn(&str) -> Option<&'a FieldValue>,
{
    let text = |field: &'static str| {
        lookup(field)
            .and_then(field_text)
            .ok_or(PlotError::MissingField { row, field })
    };
    let number = |field: &'static str| -> Result<f64> {
        let value = lookup(field).ok_or(PlotError::MissingField { row, field })?;
        match field_number(value) {
            Some(n) => Ok(n),
            None => match field_text(value) {
                Some(value) => Err(PlotError::InvalidCoordinate { row, field, value }),
                None => Err(PlotError::MissingField { row, field }),
            },
        }
    };

    Ok(PlotRow {
        site_id: text("siteID")?,
        subtype: text("subtype")?,
        plot_id: text("plotID")?,
        easting: number("easting")?,
        northing: number("northing")?,
    })
}

/// Non-empty text content of a field.
fn field_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        FieldValue::Numeric(Some(n)) => Some(n.to_string()),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric content of a field; character fields are parsed.
fn field_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Numeric(Some(n)) => Some(*n),
        FieldValue::Float(Some(n)) => Some(f64::from(*n)),
        FieldValue::Double(n) | FieldValue::Currency(n) => Some(*n),
        FieldValue::Integer(n) => Some(f64::from(*n)),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Fetches and unpacks the plot polygon archive.
pub struct PlotArchive {
    /// Directory the archive is saved and extracted into.
    data_dir: PathBuf,
    /// Archive URL.
    url: String,
    /// HTTP client for the download.
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for PlotArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlotArchive")
            .field("data_dir", &self.data_dir)
            .field("url", &self.url)
            .finish()
    }
}

impl PlotArchive {
    /// Create an archive handle for the published plot document.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        Self::with_options(data_dir, DEFAULT_PLOTS_URL, DEFAULT_TIMEOUT)
    }

    /// Create an archive handle with a custom URL and request timeout.
    pub fn with_options<P: AsRef<Path>>(data_dir: P, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            url: url.into(),
            client,
        })
    }

    /// Local path of the downloaded zip.
    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.zip", PLOTS_DOCUMENT))
    }

    /// Directory the archive is extracted into.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Download the archive, extract it, and load the attribute table.
    pub fn fetch(&self) -> Result<PlotTable> {
        let archive = self.download()?;
        let table = self.extract(&archive)?;
        PlotTable::from_path(table)
    }

    /// Download the archive into the data directory.
    pub fn download(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir)?;

        info!(url = %self.url, "Downloading plot polygon archive");
        let mut response = self.client.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(PlotError::DownloadFailed {
                url: self.url.clone(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let path = self.archive_path();
        let mut file = fs::File::create(&path)?;
        let bytes = match response.copy_to(&mut file) {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove partial archive");
                }
                return Err(e.into());
            }
        };
        debug!(path = %path.display(), bytes, "Saved plot polygon archive");

        Ok(path)
    }

    /// Extract a downloaded archive and return the path of its attribute table.
    pub fn extract(&self, archive: &Path) -> Result<PathBuf> {
        let file = fs::File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        zip.extract(&self.data_dir)?;
        self.locate_table()
    }

    /// Find the polygon attribute table under the data directory.
    pub fn locate_table(&self) -> Result<PathBuf> {
        let expected = self.data_dir.join(POLYGON_TABLE);
        if expected.is_file() {
            return Ok(expected);
        }
        find_polygon_table(&self.data_dir)?.ok_or_else(|| PlotError::TableNotFound(self.data_dir.clone()))
    }
}

/// Depth-first search for a `*Polygons*.dbf` file.
fn find_polygon_table(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = find_polygon_table(&path)? {
                return Ok(Some(found));
            }
        } else {
            let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            if name.ends_with(".dbf") && name.contains("polygons") {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}
