//! Runner configuration, loaded from YAML.
//!
//! Every field is optional; missing fields take the public NEON defaults.
//!
//! ```yaml
//! api_base_url: https://data.neonscience.org/api/v0/
//! save_dir: /data/neon
//! cull_boundary_plots: false
//! ```

use crate::RunnerError;
use neonaop_api::{CatalogError, DownloadError, HttpCatalog, IrodsDownloader, LocalDownloader, DEFAULT_API_BASE_URL};
use neonaop_tiles::{
    PlotArchive, PlotError, TileGrid, BASE_PLOT_SUBTYPE, DEFAULT_BOUNDARY_BUFFER, DEFAULT_PLOTS_URL, DEFAULT_TILE_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings shared by all runner commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Data portal API root.
    pub api_base_url: String,
    /// URL of the TOS plot polygon archive.
    pub plots_url: String,
    /// Directory the plot archive is downloaded and extracted into.
    pub plots_dir: PathBuf,
    /// Directory downloads are saved into.
    pub save_dir: PathBuf,
    /// Directory the tile list CSV is written into.
    pub output_dir: PathBuf,
    /// Local staging directory for remote data store transfers.
    pub staging_dir: PathBuf,
    /// Per-request timeout for API calls, and the connect timeout for
    /// file transfers, in seconds.
    pub request_timeout_secs: u64,
    /// Upper bound on a single file transfer, in seconds. Unset means no limit.
    pub download_timeout_secs: Option<u64>,
    /// Tile edge length, in meters.
    pub tile_size: f64,
    /// Boundary buffer around each plot centroid, in meters.
    pub boundary_buffer: f64,
    /// Drop plots whose buffer crosses a tile edge.
    pub cull_boundary_plots: bool,
    /// Plot subtype used for tile selection.
    pub plot_subtype: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            plots_url: DEFAULT_PLOTS_URL.to_string(),
            plots_dir: PathBuf::from("all_plots"),
            save_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
            staging_dir: PathBuf::from("staging"),
            request_timeout_secs: 300,
            download_timeout_secs: None,
            tile_size: DEFAULT_TILE_SIZE,
            boundary_buffer: DEFAULT_BOUNDARY_BUFFER,
            cull_boundary_plots: true,
            plot_subtype: BASE_PLOT_SUBTYPE.to_string(),
        }
    }
}

impl RunnerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(path: &Path, text: &str) -> Result<Self, RunnerError> {
        let config: Self = serde_yaml::from_str(text).map_err(|source| RunnerError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_yaml(path, &text)
    }

    /// Load a config file if one is given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, RunnerError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(RunnerError::InvalidConfig {
                field: "tile_size",
                reason: format!("must be positive, got {}", self.tile_size),
            });
        }
        if !(self.boundary_buffer.is_finite() && self.boundary_buffer >= 0.0) {
            return Err(RunnerError::InvalidConfig {
                field: "boundary_buffer",
                reason: format!("must not be negative, got {}", self.boundary_buffer),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(RunnerError::InvalidConfig {
                field: "request_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.download_timeout_secs == Some(0) {
            return Err(RunnerError::InvalidConfig {
                field: "download_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Tile grid described by this config.
    pub fn grid(&self) -> TileGrid {
        TileGrid::new(self.tile_size, self.boundary_buffer)
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Per-file transfer limit, if any.
    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }

    /// Catalog client for the configured API.
    pub fn catalog(&self) -> Result<HttpCatalog, CatalogError> {
        HttpCatalog::with_options(&self.api_base_url, self.timeout())
    }

    /// Plot archive for the configured URL and directory.
    pub fn plot_archive(&self) -> Result<PlotArchive, PlotError> {
        PlotArchive::with_options(&self.plots_dir, self.plots_url.clone(), self.timeout())
    }

    /// Local download strategy.
    pub fn local_downloader(&self) -> Result<LocalDownloader, DownloadError> {
        LocalDownloader::with_timeouts(self.timeout(), self.download_timeout())
    }

    /// Remote data store strategy, staging through [`Self::staging_dir`].
    pub fn irods_downloader(&self) -> Result<IrodsDownloader, DownloadError> {
        IrodsDownloader::new(&self.staging_dir)?.with_timeouts(self.timeout(), self.download_timeout())
    }
}
