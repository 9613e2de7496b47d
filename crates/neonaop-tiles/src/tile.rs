//! Mosaic tile grid and boundary classification.
//!
//! ## Tile Coordinate System
//!
//! Tiles are square cells of a fixed size (1000 m for AOP mosaics) aligned to
//! the origin of the projected coordinate system. A tile is identified by the
//! coordinates of its south-west corner, rendered as `"{easting}_{northing}"`,
//! which is the same substring that appears in AOP tile file names.
//!
//! Floor division is used throughout, so the grid stays consistent across the
//! origin: `-1.0` lies in tile `-1000`, not tile `0`.
//!
//! ## Boundary Buffer
//!
//! Survey plots are not points; a square buffer of half-width 20 m around the
//! plot centroid approximates the plot footprint. When that buffer crosses a
//! tile edge the plot is covered by two (or four) tiles and is classified as a
//! boundary plot instead of being assigned a tile.

use serde::{Serialize, Serializer};
use std::fmt;

/// Edge length of an AOP mosaic tile in meters.
pub const DEFAULT_TILE_SIZE: f64 = 1000.0;

/// Half-width of the square buffer placed around a plot centroid, in meters.
pub const DEFAULT_BOUNDARY_BUFFER: f64 = 20.0;

/// Key of a single grid tile (south-west corner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Easting of the west edge.
    pub easting: i64,
    /// Northing of the south edge.
    pub northing: i64,
}

impl TileKey {
    /// Create a tile key from corner coordinates.
    pub fn new(easting: i64, northing: i64) -> Self {
        Self { easting, northing }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.easting, self.northing)
    }
}

impl Serialize for TileKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Which tile edge a buffered coordinate crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    /// The buffer crosses an edge of constant northing.
    Horizontal,
    /// The buffer crosses an edge of constant easting.
    Vertical,
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryKind::Horizontal => write!(f, "horizontal"),
            BoundaryKind::Vertical => write!(f, "vertical"),
        }
    }
}

/// Result of classifying a coordinate against the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// The buffered coordinate lies entirely inside one tile.
    Tile(TileKey),
    /// The buffered coordinate crosses a tile edge.
    Boundary(BoundaryKind),
}

impl Classification {
    /// The tile key, if the coordinate is an interior point.
    pub fn tile(&self) -> Option<TileKey> {
        match self {
            Classification::Tile(key) => Some(*key),
            Classification::Boundary(_) => None,
        }
    }

    /// Check if the coordinate was flagged as a boundary coordinate.
    pub fn is_boundary(&self) -> bool {
        matches!(self, Classification::Boundary(_))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Tile(key) => key.fmt(f),
            Classification::Boundary(kind) => kind.fmt(f),
        }
    }
}

/// Square tile grid with a boundary buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    /// Tile edge length.
    pub size: f64,
    /// Half-width of the buffer placed around each coordinate.
    pub buffer: f64,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            size: DEFAULT_TILE_SIZE,
            buffer: DEFAULT_BOUNDARY_BUFFER,
        }
    }
}

impl TileGrid {
    /// Create a grid with the given tile size and buffer half-width.
    ///
    /// # Panics
    /// Panics if `size` is not strictly positive.
    pub fn new(size: f64, buffer: f64) -> Self {
        assert!(size > 0.0, "tile size must be positive, got {}", size);
        Self { size, buffer }
    }

    /// Round a value down to the nearest multiple of the tile size.
    pub fn snap(&self, value: f64) -> f64 {
        (value / self.size).floor() * self.size
    }

    /// Key of the tile containing the coordinate, ignoring the buffer.
    pub fn tile_key(&self, x: f64, y: f64) -> TileKey {
        TileKey::new(self.snap(x) as i64, self.snap(y) as i64)
    }

    /// Classify a coordinate.
    ///
    /// The horizontal check runs first and the vertical check second; a
    /// coordinate near a tile corner trips both and ends up `Vertical`.
    pub fn classify(&self, x: f64, y: f64) -> Classification {
        let mut result = Classification::Tile(self.tile_key(x, y));

        let (x_min, x_max) = (x - self.buffer, x + self.buffer);
        let (y_min, y_max) = (y - self.buffer, y + self.buffer);

        // The highest grid line at or below y_max lies inside the buffer.
        if self.snap(y_max) >= y_min {
            result = Classification::Boundary(BoundaryKind::Horizontal);
        }

        if self.snap(x_max) >= x_min {
            result = Classification::Boundary(BoundaryKind::Vertical);
        }

        result
    }

    /// Classify parallel sequences of eastings and northings element-wise.
    ///
    /// # Panics
    /// Panics if `xs` and `ys` have different lengths.
    pub fn classify_batch(&self, xs: &[f64], ys: &[f64]) -> Vec<Classification> {
        assert_eq!(
            xs.len(),
            ys.len(),
            "coordinate sequences differ in length ({} vs {})",
            xs.len(),
            ys.len()
        );
        xs.iter().zip(ys).map(|(&x, &y)| self.classify(x, y)).collect()
    }
}

/// Classify a coordinate against the default AOP grid (1000 m tiles, 20 m buffer).
pub fn classify(x: f64, y: f64) -> Classification {
    TileGrid::default().classify(x, y)
}

/// Classify parallel coordinate sequences against the default AOP grid.
///
/// # Panics
/// Panics if `xs` and `ys` have different lengths.
pub fn classify_batch(xs: &[f64], ys: &[f64]) -> Vec<Classification> {
    TileGrid::default().classify_batch(xs, ys)
}
