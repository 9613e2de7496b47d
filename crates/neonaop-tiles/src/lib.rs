//! # neonaop-tiles
//!
//! Tile grid classification and survey plot selection for NEON Airborne
//! Observation Platform (AOP) mosaic tiles.
//!
//! ## Overview
//!
//! AOP mosaic products are delivered as 1 km x 1 km tiles in the site's UTM
//! projection. Each tile file is named after its south-west corner, e.g.
//! `NEON_D01_BART_DP3_316000_4878000_reflectance.h5` covers easting
//! 316000-317000 and northing 4878000-4879000.
//!
//! This crate provides:
//! - [`TileGrid`] / [`classify`] - map a UTM coordinate to its tile key, or flag it
//!   as lying within the boundary buffer of a tile edge
//! - [`select_plots`] - classify a batch of plots, optionally cull the boundary
//!   plots, and group the rest by tile
//! - [`PlotTable`] / [`PlotArchive`] - load the TOS plot polygon attribute table,
//!   either from the published shapefile archive or from a CSV export
//!
//! ## Example
//!
//! ```
//! use neonaop_tiles::{classify, select_plots, Classification, PlotRecord, TileKey};
//!
//! assert_eq!(classify(500.0, 500.0), Classification::Tile(TileKey::new(0, 0)));
//!
//! let plots = vec![
//!     PlotRecord::new("BART_001", 316_500.0, 4_878_500.0),
//!     PlotRecord::new("BART_002", 316_990.0, 4_878_500.0), // near the x=317000 edge
//! ];
//! let selection = select_plots(&plots, true);
//! assert_eq!(selection.culled(), 1);
//! assert_eq!(selection.groups().len(), 1);
//! ```

mod error;
mod plots;
mod select;
mod tile;

pub use error::PlotError;
pub use plots::{
    PlotArchive, PlotFilter, PlotRow, PlotTable, BASE_PLOT_SUBTYPE, DEFAULT_PLOTS_URL, PLOTS_DOCUMENT,
};
pub use select::{select_plots, select_plots_with_grid, PlotRecord, Selection, TileGroups};
pub use tile::{
    classify, classify_batch, BoundaryKind, Classification, TileGrid, TileKey, DEFAULT_BOUNDARY_BUFFER,
    DEFAULT_TILE_SIZE,
};

/// Result type for plot loading operations.
pub type Result<T> = std::result::Result<T, PlotError>;
