//! Fetch pipelines.
//!
//! Two top-level operations are provided:
//! - [`fetch_aop_tiles`] - download the AOP mosaic tiles that cover selected
//!   plots, for every site, product, and month requested
//! - [`fetch_by_product`] - download and unpack every package of a tabular
//!   product, optionally loading its CSV tables
//!
//! Both validate their inputs before making any request and return `None`
//! when validation fails. Failures after that point (catalog requests,
//! downloads, extraction) are logged and the loop moves on to the next site,
//! product, or month; nothing already written is rolled back.

use crate::archive::{extract_packages, load_tables, Extraction, Table};
use crate::catalog::Catalog;
use crate::download::Downloader;
use crate::listing::TileListing;
use crate::matcher::match_files;
use crate::product::{DateRange, DateWindow, Package, ProductId};
use crate::ValidationError;
use neonaop_tiles::TileGroups;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Site selector meaning every site that publishes the product.
pub const ALL_SITES: &str = "all";

/// Inputs of an AOP tile fetch.
#[derive(Debug, Clone, Default)]
pub struct AopRequest {
    /// Site codes, e.g. `["BART", "TEAK"]`.
    pub sites: Vec<String>,
    /// AOP product IDs, e.g. `["DP3.30006.001"]`.
    pub products: Vec<String>,
    /// `YYYY-MM` months bounding the fetch; `None` fetches the most recent month.
    pub dates: Option<Vec<String>>,
    /// Directory handed to the download strategy.
    pub save_dir: PathBuf,
    /// Username for remote storage, if the strategy needs one.
    pub credentials: Option<String>,
}

struct ValidAopRequest {
    products: Vec<ProductId>,
    dates: DateRange,
}

fn validate_aop(request: &AopRequest) -> Result<ValidAopRequest, ValidationError> {
    let products = request
        .products
        .iter()
        .map(|p| ProductId::parse(p))
        .collect::<Result<Vec<_>, _>>()?;
    let dates = match &request.dates {
        None => DateRange::MostRecent,
        Some(values) => DateRange::parse(values.as_slice())?,
    };
    Ok(ValidAopRequest { products, dates })
}

/// Download the tiles covering each site's plots.
///
/// `site_groups` holds the plot grouping of each site; a site without an
/// entry has no tiles to fetch. For every site, product, and selected month,
/// the published files are matched against the site's tile keys and the
/// matches are handed to `downloader`. The returned listing holds every
/// matched file, including those whose download failed.
pub fn fetch_aop_tiles(
    catalog: &dyn Catalog,
    downloader: &dyn Downloader,
    site_groups: &BTreeMap<String, TileGroups>,
    request: &AopRequest,
) -> Option<TileListing> {
    let valid = match validate_aop(request) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("{}", e);
            return None;
        }
    };

    let mut listing = TileListing::new(&request.sites);

    for site in &request.sites {
        let groups = match site_groups.get(site) {
            Some(groups) if !groups.is_empty() => groups,
            _ => {
                warn!(site = %site, "No plot tiles selected for site");
                continue;
            }
        };

        for product in &valid.products {
            let available = match catalog.available_windows(product, site) {
                Ok(windows) => windows,
                Err(e) => {
                    warn!(site = %site, product = %product, error = %e, "Availability check failed");
                    continue;
                }
            };
            let windows = valid.dates.select(&available);
            if windows.is_empty() {
                info!(site = %site, product = %product, "No data in the requested months");
                continue;
            }

            for window in windows {
                let files = match catalog.files(product, site, window, None) {
                    Ok(files) => files,
                    Err(e) => {
                        warn!(site = %site, product = %product, month = %window, error = %e, "File listing failed");
                        continue;
                    }
                };
                let matches = match_files(groups, &files);
                info!(
                    site = %site,
                    product = %product,
                    month = %window,
                    published = files.len(),
                    matched = matches.len(),
                    "Matched tiles"
                );
                if matches.is_empty() {
                    continue;
                }

                if let Err(e) = downloader.download(&matches.urls(), &request.save_dir, request.credentials.as_deref()) {
                    warn!(site = %site, product = %product, month = %window, error = %e, "Download failed");
                    listing.record_failed_download();
                }
                listing.extend(site, product, window, matches);
            }
        }
        info!(site = %site, dir = %request.save_dir.display(), "Done downloading files");
    }

    Some(listing)
}

/// Inputs of a product-wide fetch.
#[derive(Debug, Clone)]
pub struct ProductRequest {
    /// Tabular product ID, e.g. `DP1.10098.001`.
    pub product: String,
    /// Site codes; empty or `["all"]` selects every site publishing the product.
    pub sites: Vec<String>,
    /// First month to fetch, `YYYY-MM`.
    pub start: Option<String>,
    /// Last month to fetch, `YYYY-MM`.
    pub end: Option<String>,
    /// `basic` or `expanded`.
    pub package: String,
    /// Download and extraction root.
    pub save_dir: PathBuf,
    /// Parse CSV files into tables.
    pub load_tables: bool,
}

impl Default for ProductRequest {
    fn default() -> Self {
        Self {
            product: String::new(),
            sites: vec![ALL_SITES.to_string()],
            start: None,
            end: None,
            package: Package::default().to_string(),
            save_dir: PathBuf::from("data"),
            load_tables: false,
        }
    }
}

struct ValidProductRequest {
    product: ProductId,
    package: Package,
    start: Option<DateWindow>,
    end: Option<DateWindow>,
}

fn validate_product(request: &ProductRequest) -> Result<ValidProductRequest, ValidationError> {
    let product = ProductId::parse_tabular(&request.product)?;
    let package = request.package.parse()?;
    let start = request.start.as_deref().map(str::parse).transpose()?;
    let end = request.end.as_deref().map(str::parse).transpose()?;
    Ok(ValidProductRequest {
        product,
        package,
        start,
        end,
    })
}

/// Result of a product-wide fetch.
#[derive(Debug, Clone, Default)]
pub struct ProductDownload {
    /// Every file the download strategy reported.
    pub files: Vec<PathBuf>,
    /// One entry per site and month with extracted packages.
    pub extractions: Vec<Extraction>,
    /// Tables keyed by the name following the product ID in the file name.
    pub tables: BTreeMap<String, Table>,
}

/// Download, extract, and optionally load every package of a tabular product.
pub fn fetch_by_product(
    catalog: &dyn Catalog,
    downloader: &dyn Downloader,
    request: &ProductRequest,
) -> Option<ProductDownload> {
    let valid = match validate_product(request) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("{}", e);
            return None;
        }
    };
    let product = &valid.product;

    let mut download = ProductDownload::default();
    for (site, available) in resolve_sites(catalog, product, &request.sites) {
        let windows: Vec<DateWindow> = available
            .into_iter()
            .filter(|w| valid.start.map_or(true, |s| *w >= s) && valid.end.map_or(true, |e| *w <= e))
            .collect();
        if windows.is_empty() {
            info!(site = %site, product = %product, "No data in the requested months");
            continue;
        }

        for window in windows {
            let files = match catalog.files(product, &site, window, Some(valid.package)) {
                Ok(files) => files,
                Err(e) => {
                    warn!(site = %site, product = %product, month = %window, error = %e, "File listing failed");
                    continue;
                }
            };
            let urls: BTreeMap<String, String> = files.into_iter().map(|f| (f.name, f.url)).collect();
            let saved = match downloader.download(&urls, &request.save_dir, None) {
                Ok(saved) => saved,
                Err(e) => {
                    warn!(site = %site, product = %product, month = %window, error = %e, "Download failed");
                    continue;
                }
            };

            match extract_packages(&request.save_dir, &site, product, window, &saved) {
                Ok(extraction) => {
                    if !extraction.archives.is_empty() {
                        download.extractions.push(extraction);
                    }
                }
                Err(e) => {
                    warn!(site = %site, product = %product, month = %window, error = %e, "Extraction failed");
                }
            }
            download.files.extend(saved);
        }
    }

    if request.load_tables {
        let mut candidates = download.files.clone();
        for extraction in &download.extractions {
            candidates.extend(extraction.files.iter().cloned());
        }
        match load_tables(product, &candidates) {
            Ok(tables) => download.tables = tables,
            Err(e) => warn!(product = %product, error = %e, "Loading tables failed"),
        }
    }

    info!(
        product = %product,
        files = download.files.len(),
        packages = download.extractions.len(),
        tables = download.tables.len(),
        "Product fetch complete"
    );
    Some(download)
}

/// Available months per requested site.
///
/// Sites whose availability cannot be determined are logged and skipped.
fn resolve_sites(catalog: &dyn Catalog, product: &ProductId, sites: &[String]) -> Vec<(String, Vec<DateWindow>)> {
    let all = sites.is_empty() || sites.iter().any(|s| s.eq_ignore_ascii_case(ALL_SITES));
    if all {
        return match catalog.product(product) {
            Ok(info) => info
                .site_codes
                .into_iter()
                .map(|s| {
                    let mut months = s.available_months;
                    months.sort();
                    (s.site_code, months)
                })
                .collect(),
            Err(e) => {
                warn!(product = %product, error = %e, "Product lookup failed");
                Vec::new()
            }
        };
    }

    sites
        .iter()
        .filter_map(|site| match catalog.available_windows(product, site) {
            Ok(windows) => Some((site.clone(), windows)),
            Err(e) => {
                warn!(
                    site = %site,
                    product = %product,
                    error = %e,
                    "{} is not available for {}",
                    product,
                    site
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProductInfo, ProductSite, RemoteFile, SiteInfo};
    use crate::{CatalogError, DownloadError};
    use neonaop_tiles::TileKey;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::io::Write;
    use std::path::Path;

    fn w(s: &str) -> DateWindow {
        s.parse().unwrap()
    }

    /// Catalog answering from memory and recording every call.
    #[derive(Default)]
    struct FakeCatalog {
        windows: BTreeMap<String, Vec<DateWindow>>,
        files: Vec<RemoteFile>,
        site_files: BTreeMap<String, Vec<RemoteFile>>,
        failing_listings: Vec<String>,
        calls: Cell<usize>,
        listed: RefCell<Vec<(String, DateWindow, Option<Package>)>>,
    }

    impl FakeCatalog {
        fn with_site(mut self, site: &str, months: &[&str]) -> Self {
            self.windows.insert(site.to_string(), months.iter().map(|m| w(m)).collect());
            self
        }

        fn with_files(mut self, names: &[&str]) -> Self {
            self.files = remote_files(names);
            self
        }

        /// Files published for one site only; other sites fall back to `files`.
        fn with_site_files(mut self, site: &str, names: &[&str]) -> Self {
            self.site_files.insert(site.to_string(), remote_files(names));
            self
        }

        fn with_failing_listing(mut self, site: &str) -> Self {
            self.failing_listings.push(site.to_string());
            self
        }
    }

    fn remote_files(names: &[&str]) -> Vec<RemoteFile> {
        names
            .iter()
            .map(|n| RemoteFile::new(*n, format!("https://x/{}", n)))
            .collect()
    }

    impl Catalog for FakeCatalog {
        fn site(&self, site: &str) -> Result<SiteInfo, CatalogError> {
            self.calls.set(self.calls.get() + 1);
            Err(CatalogError::Status {
                url: format!("sites/{}", site),
                status: 404,
                detail: String::new(),
            })
        }

        fn product(&self, product: &ProductId) -> Result<ProductInfo, CatalogError> {
            self.calls.set(self.calls.get() + 1);
            Ok(ProductInfo {
                product_code: product.to_string(),
                product_name: String::new(),
                site_codes: self
                    .windows
                    .iter()
                    .map(|(site, months)| ProductSite {
                        site_code: site.clone(),
                        available_months: months.clone(),
                    })
                    .collect(),
            })
        }

        fn files(
            &self,
            _product: &ProductId,
            site: &str,
            window: DateWindow,
            package: Option<Package>,
        ) -> Result<Vec<RemoteFile>, CatalogError> {
            self.calls.set(self.calls.get() + 1);
            self.listed.borrow_mut().push((site.to_string(), window, package));
            if self.failing_listings.iter().any(|s| s == site) {
                return Err(CatalogError::Status {
                    url: format!("data/{}/{}", site, window),
                    status: 500,
                    detail: String::new(),
                });
            }
            Ok(self.site_files.get(site).unwrap_or(&self.files).clone())
        }

        fn available_windows(&self, product: &ProductId, site: &str) -> Result<Vec<DateWindow>, CatalogError> {
            self.calls.set(self.calls.get() + 1);
            let mut months = self
                .windows
                .get(site)
                .cloned()
                .ok_or_else(|| CatalogError::ProductNotAtSite {
                    product: product.to_string(),
                    site: site.to_string(),
                })?;
            months.sort();
            Ok(months)
        }
    }

    /// Downloader writing fixture bodies into the target directory.
    #[derive(Default)]
    struct FakeDownloader {
        bodies: BTreeMap<String, Vec<u8>>,
        fail: bool,
        fail_on: Vec<String>,
        batches: RefCell<Vec<(Vec<String>, Option<String>)>>,
    }

    impl Downloader for FakeDownloader {
        fn download(
            &self,
            files: &BTreeMap<String, String>,
            target_dir: &Path,
            credentials: Option<&str>,
        ) -> Result<Vec<PathBuf>, DownloadError> {
            self.batches
                .borrow_mut()
                .push((files.keys().cloned().collect(), credentials.map(str::to_string)));
            if self.fail {
                return Err(DownloadError::Status {
                    file: "any".to_string(),
                    status: 503,
                });
            }
            if let Some(name) = files.keys().find(|n| self.fail_on.contains(*n)) {
                return Err(DownloadError::Status {
                    file: name.clone(),
                    status: 503,
                });
            }
            fs::create_dir_all(target_dir)?;
            let mut saved = Vec::new();
            for name in files.keys() {
                let dest = target_dir.join(name);
                let body = self.bodies.get(name).cloned().unwrap_or_default();
                fs::write(&dest, body)?;
                saved.push(dest);
            }
            Ok(saved)
        }
    }

    fn bart_groups() -> BTreeMap<String, TileGroups> {
        let mut groups = TileGroups::new();
        groups.push(TileKey::new(316_000, 4_878_000), "BART_001");
        groups.push(TileKey::new(316_000, 4_878_000), "BART_003");
        groups.push(TileKey::new(317_000, 4_879_000), "BART_005");
        BTreeMap::from([("BART".to_string(), groups)])
    }

    fn aop_request(products: &[&str], dates: Option<Vec<&str>>) -> AopRequest {
        AopRequest {
            sites: vec!["BART".to_string()],
            products: products.iter().map(|p| p.to_string()).collect(),
            dates: dates.map(|d| d.into_iter().map(str::to_string).collect()),
            save_dir: PathBuf::from("aop"),
            credentials: Some("alice".to_string()),
        }
    }

    fn bart_harv_groups() -> BTreeMap<String, TileGroups> {
        let mut all = bart_groups();
        let mut harv = TileGroups::new();
        harv.push(TileKey::new(731_000, 4_713_000), "HARV_001");
        all.insert("HARV".to_string(), harv);
        all
    }

    const HARV_TILE: &str = "NEON_D01_HARV_DP3_731000_4713000_reflectance.h5";

    fn bart_harv_catalog() -> FakeCatalog {
        FakeCatalog::default()
            .with_site("BART", &["2019-08"])
            .with_site("HARV", &["2019-08"])
            .with_site_files("BART", &TILES)
            .with_site_files("HARV", &[HARV_TILE])
    }

    fn bart_harv_request() -> AopRequest {
        let mut request = aop_request(&["DP3.30006.001"], None);
        request.sites = vec!["BART".to_string(), "HARV".to_string()];
        request
    }

    const TILES: [&str; 3] = [
        "NEON_D01_BART_DP3_316000_4878000_reflectance.h5",
        "NEON_D01_BART_DP3_316000_4879000_reflectance.h5",
        "NEON_D01_BART_DP3_317000_4879000_reflectance.h5",
    ];

    #[test]
    fn test_aop_invalid_product_makes_no_requests() {
        let catalog = FakeCatalog::default().with_site("BART", &["2019-08"]);
        let downloader = FakeDownloader::default();
        let request = aop_request(&["DP3.30006.001", "DP3.3006.001"], None);

        assert!(fetch_aop_tiles(&catalog, &downloader, &bart_groups(), &request).is_none());
        assert_eq!(catalog.calls.get(), 0);
        assert!(downloader.batches.borrow().is_empty());
    }

    #[test]
    fn test_aop_empty_date_list_is_rejected() {
        let catalog = FakeCatalog::default().with_site("BART", &["2019-08"]);
        let request = aop_request(&["DP3.30006.001"], Some(vec![]));
        assert!(fetch_aop_tiles(&catalog, &FakeDownloader::default(), &bart_groups(), &request).is_none());
        assert_eq!(catalog.calls.get(), 0);
    }

    #[test]
    fn test_aop_most_recent_month() {
        let catalog = FakeCatalog::default()
            .with_site("BART", &["2019-08", "2017-09"])
            .with_files(&TILES);
        let downloader = FakeDownloader::default();
        let request = aop_request(&["DP3.30006.001"], None);

        let listing = fetch_aop_tiles(&catalog, &downloader, &bart_groups(), &request).unwrap();

        assert_eq!(*catalog.listed.borrow(), [("BART".to_string(), w("2019-08"), None)]);
        let batches = downloader.batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, [TILES[0], TILES[2]]);
        assert_eq!(batches[0].1.as_deref(), Some("alice"));

        assert_eq!(listing.len(), 2);
        assert_eq!(listing.failed_downloads(), 0);
        assert_eq!(listing.rows()[0].plot_ids, ["BART_001", "BART_003"]);
        assert_eq!(listing.rows()[1].plot_ids, ["BART_005"]);
        assert_eq!(listing.file_name(), "tile_list_BART.csv");
    }

    #[test]
    fn test_aop_every_month_in_range() {
        let catalog = FakeCatalog::default()
            .with_site("BART", &["2014-06", "2016-08", "2017-09", "2019-08"])
            .with_files(&TILES);
        let downloader = FakeDownloader::default();
        let request = aop_request(&["DP3.30006.001"], Some(vec!["2019-12", "2016-01"]));

        let listing = fetch_aop_tiles(&catalog, &downloader, &bart_groups(), &request).unwrap();

        let months: Vec<DateWindow> = catalog.listed.borrow().iter().map(|(_, m, _)| *m).collect();
        assert_eq!(months, [w("2016-08"), w("2017-09"), w("2019-08")]);
        assert_eq!(downloader.batches.borrow().len(), 3);
        assert_eq!(listing.len(), 6);
    }

    #[test]
    fn test_aop_failed_download_keeps_listing() {
        let catalog = FakeCatalog::default().with_site("BART", &["2019-08"]).with_files(&TILES);
        let downloader = FakeDownloader {
            fail: true,
            ..Default::default()
        };
        let request = aop_request(&["DP3.30006.001"], None);

        let listing = fetch_aop_tiles(&catalog, &downloader, &bart_groups(), &request).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.failed_downloads(), 1);
    }

    #[test]
    fn test_aop_site_without_product_is_skipped() {
        let catalog = FakeCatalog::default().with_site("BART", &["2019-08"]).with_files(&TILES);
        let downloader = FakeDownloader::default();
        let mut request = aop_request(&["DP3.30006.001"], None);
        request.sites = vec!["TEAK".to_string(), "BART".to_string()];

        let listing = fetch_aop_tiles(&catalog, &downloader, &bart_groups(), &request).unwrap();
        assert_eq!(listing.len(), 2);
        assert!(listing.rows().iter().all(|r| r.site == "BART"));
        assert_eq!(listing.file_name(), "tile_list_TEAK_BART.csv");
    }

    #[test]
    fn test_aop_site_without_groups_makes_no_requests() {
        let catalog = FakeCatalog::default().with_site("TEAK", &["2019-08"]).with_files(&TILES);
        let downloader = FakeDownloader::default();
        let mut request = aop_request(&["DP3.30006.001", "DP3.30010.001"], None);
        request.sites = vec!["TEAK".to_string()];

        let listing = fetch_aop_tiles(&catalog, &downloader, &bart_groups(), &request).unwrap();
        assert_eq!(catalog.calls.get(), 0);
        assert!(downloader.batches.borrow().is_empty());
        assert!(listing.is_empty());
    }

    #[test]
    fn test_aop_download_failure_continues_with_next_site() {
        let catalog = bart_harv_catalog();
        let downloader = FakeDownloader {
            fail_on: vec![TILES[0].to_string()],
            ..Default::default()
        };

        let listing = fetch_aop_tiles(&catalog, &downloader, &bart_harv_groups(), &bart_harv_request()).unwrap();

        let batches = downloader.batches.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].0, [HARV_TILE]);
        assert_eq!(listing.failed_downloads(), 1);
        let sites: Vec<&str> = listing.rows().iter().map(|r| r.site.as_str()).collect();
        assert_eq!(sites, ["BART", "BART", "HARV"]);
        assert_eq!(listing.rows()[2].plot_ids, ["HARV_001"]);
    }

    #[test]
    fn test_aop_listing_failure_continues_with_next_site() {
        let catalog = bart_harv_catalog().with_failing_listing("BART");
        let downloader = FakeDownloader::default();

        let listing = fetch_aop_tiles(&catalog, &downloader, &bart_harv_groups(), &bart_harv_request()).unwrap();

        let listed: Vec<String> = catalog.listed.borrow().iter().map(|(s, _, _)| s.clone()).collect();
        assert_eq!(listed, ["BART", "HARV"]);
        assert_eq!(downloader.batches.borrow().len(), 1);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.rows()[0].site, "HARV");
        assert_eq!(listing.failed_downloads(), 0);
    }

    fn package_zip() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file(
                "NEON.D01.BART.DP1.10098.001.vst_apparentindividual.2019-08.basic.20211222T013942Z.csv",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer
            .write_all(b"plotID,individualID,height\nBART_001,NEON.PLA.D01.BART.00001,12.5\n")
            .unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_by_product_rejects_remote_sensing_without_requests() {
        let catalog = FakeCatalog::default().with_site("BART", &["2019-08"]);
        let downloader = FakeDownloader::default();
        let request = ProductRequest {
            product: "DP3.30006.001".to_string(),
            ..Default::default()
        };

        assert!(fetch_by_product(&catalog, &downloader, &request).is_none());
        assert_eq!(catalog.calls.get(), 0);
        assert!(downloader.batches.borrow().is_empty());
    }

    #[test]
    fn test_by_product_rejects_bad_package() {
        let catalog = FakeCatalog::default();
        let request = ProductRequest {
            product: "DP1.10098.001".to_string(),
            package: "full".to_string(),
            ..Default::default()
        };
        assert!(fetch_by_product(&catalog, &FakeDownloader::default(), &request).is_none());
        assert_eq!(catalog.calls.get(), 0);
    }

    #[test]
    fn test_by_product_all_sites() {
        let package = "NEON.D01.BART.DP1.10098.001.2019-08.basic.20211222T013942Z.zip";
        let catalog = FakeCatalog::default()
            .with_site("BART", &["2020-08", "2019-08"])
            .with_site("HARV", &["2016-09"])
            .with_files(&[package]);
        let downloader = FakeDownloader {
            bodies: BTreeMap::from([(package.to_string(), package_zip())]),
            ..Default::default()
        };
        let tmp = tempfile::tempdir().unwrap();
        let request = ProductRequest {
            product: "DP1.10098.001".to_string(),
            start: Some("2019-01".to_string()),
            end: Some("2019-12".to_string()),
            save_dir: tmp.path().to_path_buf(),
            load_tables: true,
            ..Default::default()
        };

        let result = fetch_by_product(&catalog, &downloader, &request).unwrap();

        assert_eq!(
            *catalog.listed.borrow(),
            [("BART".to_string(), w("2019-08"), Some(Package::Basic))]
        );
        assert_eq!(result.files, [tmp.path().join(package)]);
        assert_eq!(result.extractions.len(), 1);
        assert_eq!(result.extractions[0].dir, tmp.path().join("BART/DP1.10098.001/2019-08"));

        let table = &result.tables["vst_apparentindividual"];
        assert_eq!(table.column("plotID").unwrap(), ["BART_001"]);
    }

    #[test]
    fn test_by_product_named_sites() {
        let catalog = FakeCatalog::default()
            .with_site("BART", &["2019-08"])
            .with_files(&["NEON.D01.BART.DP1.10098.001.readme.txt"]);
        let downloader = FakeDownloader::default();
        let tmp = tempfile::tempdir().unwrap();
        let request = ProductRequest {
            product: "DP1.10098.001".to_string(),
            sites: vec!["HARV".to_string(), "BART".to_string()],
            package: "expanded".to_string(),
            save_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };

        let result = fetch_by_product(&catalog, &downloader, &request).unwrap();
        assert_eq!(
            *catalog.listed.borrow(),
            [("BART".to_string(), w("2019-08"), Some(Package::Expanded))]
        );
        assert_eq!(result.files.len(), 1);
        assert!(result.extractions.is_empty());
        assert!(result.tables.is_empty());
    }

    const BART_PACKAGE: &str = "NEON.D01.BART.DP1.10098.001.2019-08.basic.20211222T013942Z.zip";
    const HARV_PACKAGE: &str = "NEON.D01.HARV.DP1.10098.001.2019-08.basic.20211222T013942Z.zip";

    fn bart_harv_product(tmp: &Path) -> (FakeCatalog, ProductRequest) {
        let catalog = FakeCatalog::default()
            .with_site("BART", &["2019-08"])
            .with_site("HARV", &["2019-08"])
            .with_site_files("BART", &[BART_PACKAGE])
            .with_site_files("HARV", &[HARV_PACKAGE]);
        let request = ProductRequest {
            product: "DP1.10098.001".to_string(),
            sites: vec!["BART".to_string(), "HARV".to_string()],
            save_dir: tmp.to_path_buf(),
            load_tables: true,
            ..Default::default()
        };
        (catalog, request)
    }

    fn assert_harv_loaded(result: &ProductDownload, tmp: &Path) {
        assert_eq!(result.extractions.len(), 1);
        assert_eq!(result.extractions[0].dir, tmp.join("HARV/DP1.10098.001/2019-08"));
        let table = &result.tables["vst_apparentindividual"];
        assert_eq!(table.column("plotID").unwrap(), ["BART_001"]);
    }

    #[test]
    fn test_by_product_download_failure_continues_with_next_site() {
        let tmp = tempfile::tempdir().unwrap();
        let (catalog, request) = bart_harv_product(tmp.path());
        let downloader = FakeDownloader {
            bodies: BTreeMap::from([(HARV_PACKAGE.to_string(), package_zip())]),
            fail_on: vec![BART_PACKAGE.to_string()],
            ..Default::default()
        };

        let result = fetch_by_product(&catalog, &downloader, &request).unwrap();

        assert_eq!(downloader.batches.borrow().len(), 2);
        assert_eq!(result.files, [tmp.path().join(HARV_PACKAGE)]);
        assert_harv_loaded(&result, tmp.path());
    }

    #[test]
    fn test_by_product_listing_failure_continues_with_next_site() {
        let tmp = tempfile::tempdir().unwrap();
        let (catalog, request) = bart_harv_product(tmp.path());
        let catalog = catalog.with_failing_listing("BART");
        let downloader = FakeDownloader {
            bodies: BTreeMap::from([(HARV_PACKAGE.to_string(), package_zip())]),
            ..Default::default()
        };

        let result = fetch_by_product(&catalog, &downloader, &request).unwrap();

        assert_eq!(catalog.listed.borrow().len(), 2);
        let batches = downloader.batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, [HARV_PACKAGE]);
        assert_eq!(result.files, [tmp.path().join(HARV_PACKAGE)]);
        assert_harv_loaded(&result, tmp.path());
    }

    #[test]
    fn test_by_product_corrupt_package_continues_with_next_site() {
        let tmp = tempfile::tempdir().unwrap();
        let (catalog, request) = bart_harv_product(tmp.path());
        let downloader = FakeDownloader {
            bodies: BTreeMap::from([
                (BART_PACKAGE.to_string(), b"not a zip archive".to_vec()),
                (HARV_PACKAGE.to_string(), package_zip()),
            ]),
            ..Default::default()
        };

        let result = fetch_by_product(&catalog, &downloader, &request).unwrap();

        assert_eq!(
            result.files,
            [tmp.path().join(BART_PACKAGE), tmp.path().join(HARV_PACKAGE)]
        );
        assert_harv_loaded(&result, tmp.path());
    }
}
