//! # neonaop-api
//!
//! Client for the NEON data portal API: product validation, data
//! availability, tile file matching, downloads, and package extraction.
//!
//! ## Overview
//!
//! The portal publishes data per product, site, and month. AOP remote sensing
//! products (`DP3.*`) are split into 1 km tiles whose file names carry the
//! tile's south-west corner, which is how [`match_files`] finds the files
//! covering a tile grouping from `neonaop-tiles`. Tabular products are
//! published as zip packages that [`extract_packages`] unpacks into
//! `save_dir/{site}/{product}/{YYYY-MM}/`.
//!
//! Network access goes through two traits so that either side can be swapped:
//! - [`Catalog`] - site and product metadata and monthly file listings;
//!   [`HttpCatalog`] talks to `https://data.neonscience.org/api/v0/`
//! - [`Downloader`] - moves files to storage; [`LocalDownloader`] writes to a
//!   local directory, [`IrodsDownloader`] pushes to an iRODS data store
//!
//! [`fetch_aop_tiles`] and [`fetch_by_product`] tie these together.
//!
//! ## Example
//!
//! ```no_run
//! use neonaop_api::{fetch_aop_tiles, AopRequest, HttpCatalog, LocalDownloader};
//! use neonaop_tiles::{select_plots, PlotRecord};
//! use std::collections::BTreeMap;
//!
//! let plots = vec![PlotRecord::new("BART_001", 316_500.0, 4_878_500.0)];
//! let groups = BTreeMap::from([("BART".to_string(), select_plots(&plots, true).into_groups())]);
//!
//! let request = AopRequest {
//!     sites: vec!["BART".to_string()],
//!     products: vec!["DP3.30006.001".to_string()],
//!     dates: Some(vec!["2019-08".to_string()]),
//!     save_dir: "aop".into(),
//!     credentials: None,
//! };
//! let catalog = HttpCatalog::new()?;
//! let downloader = LocalDownloader::new()?;
//! if let Some(listing) = fetch_aop_tiles(&catalog, &downloader, &groups, &request) {
//!     listing.write_csv("aop".as_ref())?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod archive;
mod catalog;
mod download;
mod error;
mod listing;
mod matcher;
mod pipeline;
mod product;

pub use archive::{extract_packages, extraction_dir, load_tables, table_token, Extraction, Table};
pub use catalog::{
    parse_files, parse_product, parse_site, Catalog, HttpCatalog, ProductInfo, ProductSite, RemoteFile, SiteInfo,
    SiteProduct, DEFAULT_API_BASE_URL,
};
pub use download::{Downloader, IrodsDownloader, LocalDownloader};
pub use error::{ApiError, ArchiveError, CatalogError, DownloadError, ValidationError};
pub use listing::{ListingRow, TileListing, PLOT_ID_SEPARATOR};
pub use matcher::{match_files, FileMatches, MatchedFile};
pub use pipeline::{fetch_aop_tiles, fetch_by_product, AopRequest, ProductDownload, ProductRequest, ALL_SITES};
pub use product::{DateRange, DateWindow, Package, ProductId};

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
