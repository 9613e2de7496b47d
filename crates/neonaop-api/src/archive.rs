//! Extraction of downloaded zip packages and loading of their CSV tables.
//!
//! Packages of one product, site, and month are unpacked into
//! `save_dir/{site}/{product}/{YYYY-MM}/`. Tables are keyed by the part of
//! the file name that follows the product ID, e.g.
//! `NEON.D01.BART.DP1.10098.001.vst_mappingandtagging.basic.20211222T013942Z.csv`
//! is loaded as `vst_mappingandtagging`.

use crate::product::{DateWindow, ProductId};
use crate::ArchiveError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A parsed CSV table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a CSV file with a header row.
    pub fn from_path(path: &Path) -> Result<Self, ArchiveError> {
        let csv_err = |source| ArchiveError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;
        let headers = reader.headers().map_err(csv_err)?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    /// Column names.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of a named column; short rows yield empty strings.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }
}

/// Name under which a CSV file's table is stored.
///
/// This is the text between `"{product}."` and the next `.`; files without
/// the product ID, or with nothing after it, have no table name.
pub fn table_token<'a>(product: &ProductId, file_name: &'a str) -> Option<&'a str> {
    let marker = format!("{}.", product);
    let start = file_name.find(&marker)? + marker.len();
    let rest = &file_name[start..];
    let token = rest.split('.').next().unwrap_or("");
    (!token.is_empty()).then_some(token)
}

/// Directory a month's packages are extracted into.
pub fn extraction_dir(save_dir: &Path, site: &str, product: &ProductId, window: DateWindow) -> PathBuf {
    save_dir.join(site).join(product.as_str()).join(window.to_string())
}

/// Files produced by extracting one month's packages.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Directory the archives were extracted into.
    pub dir: PathBuf,
    /// Archives that were extracted.
    pub archives: Vec<PathBuf>,
    /// Files written by the extraction.
    pub files: Vec<PathBuf>,
}

/// Extract the zip packages of one month.
///
/// Only downloaded files whose names contain the month and `zip` are treated
/// as packages; everything else is left alone.
pub fn extract_packages(
    save_dir: &Path,
    site: &str,
    product: &ProductId,
    window: DateWindow,
    downloaded: &[PathBuf],
) -> Result<Extraction, ArchiveError> {
    let month = window.to_string();
    let dir = extraction_dir(save_dir, site, product, window);
    let mut extraction = Extraction {
        dir: dir.clone(),
        ..Default::default()
    };

    for path in downloaded {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !(name.contains(&month) && name.contains("zip")) {
            continue;
        }

        fs::create_dir_all(&dir)?;
        let zip_err = |source| ArchiveError::Zip {
            path: path.clone(),
            source,
        };
        let file = fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(zip_err)?;
        let entries: Vec<PathBuf> = archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(|n| dir.join(n))
            .collect();
        archive.extract(&dir).map_err(zip_err)?;

        debug!(archive = %path.display(), files = entries.len(), dir = %dir.display(), "Extracted package");
        extraction.archives.push(path.clone());
        extraction.files.extend(entries);
    }

    Ok(extraction)
}

/// Load every CSV file whose name yields a table token.
///
/// When two files share a token, the later file in `paths` wins.
pub fn load_tables(product: &ProductId, paths: &[PathBuf]) -> Result<BTreeMap<String, Table>, ArchiveError> {
    let mut tables = BTreeMap::new();
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        let Some(token) = table_token(product, name) else {
            continue;
        };
        let table = Table::from_path(path)?;
        debug!(table = token, rows = table.len(), "Loaded table");
        if tables.insert(token.to_string(), table).is_some() {
            warn!(table = token, file = %name, "Replaced table loaded from an earlier file");
        }
    }
    Ok(tables)
}
