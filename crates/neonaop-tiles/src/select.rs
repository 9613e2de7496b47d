//! Plot selection: classify plots and group them by mosaic tile.

use crate::tile::{BoundaryKind, Classification, TileGrid, TileKey};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A survey plot reduced to its identifier and centroid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRecord {
    /// Plot identifier, e.g. `BART_001`.
    pub plot_id: String,
    /// UTM easting of the plot centroid.
    pub easting: f64,
    /// UTM northing of the plot centroid.
    pub northing: f64,
}

impl PlotRecord {
    /// Create a plot record.
    pub fn new(plot_id: impl Into<String>, easting: f64, northing: f64) -> Self {
        Self {
            plot_id: plot_id.into(),
            easting,
            northing,
        }
    }
}

/// Plot identifiers grouped by the tile that covers them.
///
/// Keys iterate in ascending (easting, northing) order; within a tile, plot
/// identifiers keep the order in which the plots were supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TileGroups {
    groups: BTreeMap<TileKey, Vec<String>>,
}

impl TileGroups {
    /// Create an empty grouping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plot identifier to a tile's group.
    pub fn push(&mut self, key: TileKey, plot_id: impl Into<String>) {
        self.groups.entry(key).or_default().push(plot_id.into());
    }

    /// Plot identifiers for a tile.
    pub fn get(&self, key: &TileKey) -> Option<&[String]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Iterate over tiles and their plot identifiers.
    pub fn iter(&self) -> impl Iterator<Item = (&TileKey, &Vec<String>)> {
        self.groups.iter()
    }

    /// Tile keys in iteration order.
    pub fn keys(&self) -> impl Iterator<Item = &TileKey> {
        self.groups.keys()
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if no tile has any plots.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of plots across all tiles.
    pub fn plot_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

impl<'a> IntoIterator for &'a TileGroups {
    type Item = (&'a TileKey, &'a Vec<String>);
    type IntoIter = std::collections::btree_map::Iter<'a, TileKey, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Outcome of a plot selection run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    groups: TileGroups,
    boundary: Vec<(String, BoundaryKind)>,
    culled: usize,
}

impl Selection {
    /// Plot identifiers grouped by tile.
    pub fn groups(&self) -> &TileGroups {
        &self.groups
    }

    /// Consume the selection, keeping only the grouping.
    pub fn into_groups(self) -> TileGroups {
        self.groups
    }

    /// Plots whose buffer crossed a tile edge, in input order.
    ///
    /// Reported whether or not they were culled.
    pub fn boundary_plots(&self) -> &[(String, BoundaryKind)] {
        &self.boundary
    }

    /// Number of plots dropped because they were boundary plots.
    pub fn culled(&self) -> usize {
        self.culled
    }
}

/// Select plots against the default AOP grid.
///
/// See [`select_plots_with_grid`].
pub fn select_plots(plots: &[PlotRecord], cull_boundary: bool) -> Selection {
    select_plots_with_grid(&TileGrid::default(), plots, cull_boundary)
}

/// Classify every plot and group the plot identifiers by tile.
///
/// With `cull_boundary` set, plots classified as horizontal or vertical
/// boundary plots are dropped. Otherwise they are kept under the tile that
/// contains their centroid. An input where every plot is culled yields an
/// empty grouping.
pub fn select_plots_with_grid(grid: &TileGrid, plots: &[PlotRecord], cull_boundary: bool) -> Selection {
    let mut selection = Selection::default();

    for plot in plots {
        let key = match grid.classify(plot.easting, plot.northing) {
            Classification::Tile(key) => key,
            Classification::Boundary(kind) => {
                selection.boundary.push((plot.plot_id.clone(), kind));
                if cull_boundary {
                    selection.culled += 1;
                    continue;
                }
                grid.tile_key(plot.easting, plot.northing)
            }
        };
        selection.groups.push(key, plot.plot_id.clone());
    }

    debug!(
        plots = plots.len(),
        tiles = selection.groups.len(),
        boundary = selection.boundary.len(),
        culled = selection.culled,
        "Selected plots"
    );

    selection
}
