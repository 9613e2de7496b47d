//! Command implementations shared by the CLI and tests.

use crate::config::RunnerConfig;
use crate::RunnerError;
use neonaop_api::{
    fetch_aop_tiles, fetch_by_product, AopRequest, Catalog, DateWindow, Downloader, ProductDownload, ProductId,
    ProductRequest, TileListing,
};
use neonaop_tiles::{PlotTable, Selection, TileGroups};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load the plot table from a local `.dbf`/`.csv` file, or fetch the
/// published archive into the configured plots directory.
pub fn load_plot_table(config: &RunnerConfig, plots_file: Option<&Path>) -> Result<PlotTable, RunnerError> {
    let table = match plots_file {
        Some(path) => PlotTable::from_path(path)?,
        None => config.plot_archive()?.fetch()?,
    };
    info!(rows = table.len(), "Loaded plot table");
    Ok(table)
}

/// Select each site's plots with the configured grid, subtype, and culling.
pub fn select_sites(config: &RunnerConfig, table: &PlotTable, sites: &[String]) -> BTreeMap<String, Selection> {
    table.select_sites(sites, &config.plot_subtype, &config.grid(), config.cull_boundary_plots)
}

/// Reduce selections to their tile groupings.
pub fn tile_groups(selections: BTreeMap<String, Selection>) -> BTreeMap<String, TileGroups> {
    selections
        .into_iter()
        .map(|(site, selection)| (site, selection.into_groups()))
        .collect()
}

/// Months in which a product has data at a site.
pub fn available_dates(catalog: &dyn Catalog, product: &str, site: &str) -> Result<Vec<DateWindow>, RunnerError> {
    let product = ProductId::parse(product)?;
    Ok(catalog.available_windows(&product, site)?)
}

/// Fetch AOP tiles and write the tile list into the output directory.
pub fn fetch_tiles(
    config: &RunnerConfig,
    catalog: &dyn Catalog,
    downloader: &dyn Downloader,
    groups: &BTreeMap<String, TileGroups>,
    request: &AopRequest,
) -> Result<(TileListing, PathBuf), RunnerError> {
    let listing = fetch_aop_tiles(catalog, downloader, groups, request).ok_or(RunnerError::Rejected("AOP tile fetch"))?;
    let path = listing.write_csv(&config.output_dir)?;
    info!(
        files = listing.len(),
        failed_downloads = listing.failed_downloads(),
        path = %path.display(),
        "Wrote tile list"
    );
    Ok((listing, path))
}

/// Fetch every package of a tabular product.
pub fn fetch_product(
    catalog: &dyn Catalog,
    downloader: &dyn Downloader,
    request: &ProductRequest,
) -> Result<ProductDownload, RunnerError> {
    fetch_by_product(catalog, downloader, request).ok_or(RunnerError::Rejected("Product fetch"))
}
