//! Data portal catalog: site metadata, product metadata, and file listings.
//!
//! Endpoints used, relative to `https://data.neonscience.org/api/v0/`:
//! - `sites/{site}` - site metadata, including available months per product
//! - `products/{product}` - product metadata, including available months per site
//! - `data/{product}/{site}/{YYYY-MM}` - files published for one month
//!
//! Every response wraps its payload in a `data` object; failures carry an
//! `error` object with a `detail` message instead.

use crate::product::{DateWindow, Package, ProductId};
use crate::CatalogError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Base URL of the NEON data portal API.
pub const DEFAULT_API_BASE_URL: &str = "https://data.neonscience.org/api/v0/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A file published by the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// File name.
    pub name: String,
    /// Download URL.
    pub url: String,
}

impl RemoteFile {
    /// Create a file descriptor.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Availability of one product at a site.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProduct {
    /// Product ID string.
    pub data_product_code: String,
    /// Product title.
    #[serde(default)]
    pub data_product_title: String,
    /// Months with published data.
    #[serde(default)]
    pub available_months: Vec<DateWindow>,
}

/// Site metadata from `sites/{site}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    /// Four-letter site code.
    pub site_code: String,
    /// Human readable site name.
    #[serde(default)]
    pub site_name: String,
    /// Products published for this site.
    #[serde(default)]
    pub data_products: Vec<SiteProduct>,
}

impl SiteInfo {
    /// Available months of a product at this site, ascending.
    pub fn available_windows(&self, product: &ProductId) -> Option<Vec<DateWindow>> {
        self.data_products
            .iter()
            .find(|p| p.data_product_code == product.as_str())
            .map(|p| {
                let mut months = p.available_months.clone();
                months.sort();
                months
            })
    }
}

/// Availability of a product at one site.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSite {
    /// Site code.
    pub site_code: String,
    /// Months with published data.
    #[serde(default)]
    pub available_months: Vec<DateWindow>,
}

/// Product metadata from `products/{product}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    /// Product ID string.
    pub product_code: String,
    /// Product name.
    #[serde(default)]
    pub product_name: String,
    /// Sites where the product is published.
    #[serde(default)]
    pub site_codes: Vec<ProductSite>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Deserialize)]
struct FileListing {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

/// Parse a `{"data": ...}` response body.
fn parse_data<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, CatalogError> {
    serde_json::from_str::<Envelope<T>>(body)
        .map(|e| e.data)
        .map_err(|source| CatalogError::Parse {
            url: url.to_string(),
            source,
        })
}

/// Parse a `sites/{site}` response body.
pub fn parse_site(url: &str, body: &str) -> Result<SiteInfo, CatalogError> {
    parse_data(url, body)
}

/// Parse a `products/{product}` response body.
pub fn parse_product(url: &str, body: &str) -> Result<ProductInfo, CatalogError> {
    parse_data(url, body)
}

/// Parse a `data/{product}/{site}/{month}` response body.
pub fn parse_files(url: &str, body: &str) -> Result<Vec<RemoteFile>, CatalogError> {
    parse_data::<FileListing>(url, body).map(|l| l.files)
}

/// Read-only view of the data portal catalog.
pub trait Catalog {
    /// Site metadata.
    fn site(&self, site: &str) -> Result<SiteInfo, CatalogError>;

    /// Product metadata.
    fn product(&self, product: &ProductId) -> Result<ProductInfo, CatalogError>;

    /// Files published for one product, site, and month.
    ///
    /// With a package, only that package's files are listed.
    fn files(
        &self,
        product: &ProductId,
        site: &str,
        window: DateWindow,
        package: Option<Package>,
    ) -> Result<Vec<RemoteFile>, CatalogError>;

    /// Months in which a product has data at a site, ascending.
    fn available_windows(&self, product: &ProductId, site: &str) -> Result<Vec<DateWindow>, CatalogError> {
        self.site(site)?
            .available_windows(product)
            .ok_or_else(|| CatalogError::ProductNotAtSite {
                product: product.to_string(),
                site: site.to_string(),
            })
    }
}

/// Catalog backed by the portal's HTTP API.
pub struct HttpCatalog {
    /// Base URL ending in `/`.
    base_url: String,
    /// HTTP client for API requests.
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for HttpCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalog").field("base_url", &self.base_url).finish()
    }
}

impl HttpCatalog {
    /// Create a catalog for the public NEON API.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_options(DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a catalog for a custom base URL and request timeout.
    pub fn with_options(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { base_url, client })
    }

    /// Base URL of the API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a site resource.
    pub fn site_url(&self, site: &str) -> String {
        format!("{}sites/{}", self.base_url, site)
    }

    /// URL of a product resource.
    pub fn product_url(&self, product: &ProductId) -> String {
        format!("{}products/{}", self.base_url, product)
    }

    /// URL of a monthly file listing.
    pub fn files_url(&self, product: &ProductId, site: &str, window: DateWindow, package: Option<Package>) -> String {
        let mut url = format!("{}data/{}/{}/{}", self.base_url, product, site, window);
        if let Some(package) = package {
            url.push_str("?package=");
            url.push_str(package.as_str());
        }
        url
    }

    /// GET a URL and return the body, mapping error statuses to [`CatalogError::Status`].
    fn get(&self, url: &str) -> Result<String, CatalogError> {
        debug!(url = %url, "Catalog request");
        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.detail)
                .unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), detail = %detail, "Catalog request failed");
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                detail,
            });
        }
        Ok(body)
    }
}

impl Catalog for HttpCatalog {
    fn site(&self, site: &str) -> Result<SiteInfo, CatalogError> {
        let url = self.site_url(site);
        let body = self.get(&url)?;
        parse_site(&url, &body)
    }

    fn product(&self, product: &ProductId) -> Result<ProductInfo, CatalogError> {
        let url = self.product_url(product);
        let body = self.get(&url)?;
        parse_product(&url, &body)
    }

    fn files(
        &self,
        product: &ProductId,
        site: &str,
        window: DateWindow,
        package: Option<Package>,
    ) -> Result<Vec<RemoteFile>, CatalogError> {
        let url = self.files_url(product, site, window, package);
        let body = self.get(&url)?;
        parse_files(&url, &body)
    }
}
