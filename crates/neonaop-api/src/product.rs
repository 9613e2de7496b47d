//! Product IDs, download packages, and monthly date windows.

use crate::ValidationError;
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref PRODUCT_ID_RE: Regex = Regex::new(r"^DP[1-4]\.[0-9]{5}\.001$").unwrap();
}

/// Phenocam image products; listed in the catalog but hosted elsewhere.
const PHENOCAM_PRODUCTS: [&str; 2] = ["DP1.00033.001", "DP1.00042.001"];

/// A NEON data product identifier such as `DP3.30006.001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductId(String);

impl ProductId {
    /// Parse a product ID, checking only its format.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if !PRODUCT_ID_RE.is_match(s) {
            return Err(ValidationError::InvalidProductId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Parse a product ID that can be retrieved product-wide as zip packages.
    ///
    /// Remote sensing (`DP3`) products and phenocam image products are
    /// rejected in addition to malformed IDs.
    pub fn parse_tabular(s: &str) -> Result<Self, ValidationError> {
        let id = Self::parse(s)?;
        if id.is_remote_sensing() {
            return Err(ValidationError::RemoteSensingProduct(id.0));
        }
        if PHENOCAM_PRODUCTS.contains(&id.as_str()) {
            return Err(ValidationError::PhenocamProduct(id.0));
        }
        Ok(id)
    }

    /// Check if this is an AOP remote sensing product.
    pub fn is_remote_sensing(&self) -> bool {
        self.0.starts_with("DP3")
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Download package variant of a tabular product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Package {
    /// Core data fields only.
    #[default]
    Basic,
    /// Core fields plus quality and auxiliary fields.
    Expanded,
}

impl Package {
    /// Name used in query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Package::Basic => "basic",
            Package::Expanded => "expanded",
        }
    }
}

impl FromStr for Package {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Package::Basic),
            "expanded" => Ok(Package::Expanded),
            other => Err(ValidationError::InvalidPackage(other.to_string())),
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One month of data availability, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateWindow {
    year: i32,
    month: u32,
}

impl DateWindow {
    /// Create a window, checking that the month is in range.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|d| Self {
                year: d.year(),
                month: d.month(),
            })
            .ok_or_else(|| ValidationError::InvalidDateWindow(format!("{}-{}", year, month)))
    }

    /// Calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, 1-12.
    pub fn month(&self) -> u32 {
        self.month
    }
}

impl FromStr for DateWindow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ValidationError::InvalidDateWindow(s.to_string());
        // Require the zero-padded form; chrono alone would also accept "2019-8".
        if s.len() != 7 {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").map_err(|_| invalid())?;
        Ok(Self {
            year: date.year(),
            month: date.month(),
        })
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for DateWindow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateWindow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which of the available months to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    /// Only the latest available month.
    #[default]
    MostRecent,
    /// Every available month between two bounds, inclusive.
    Between {
        /// First month.
        start: DateWindow,
        /// Last month.
        end: DateWindow,
    },
}

impl DateRange {
    /// Build a range spanning the earliest to the latest of the given months.
    ///
    /// The months may come in any order.
    pub fn spanning(windows: &[DateWindow]) -> Result<Self, ValidationError> {
        let start = windows.iter().min().ok_or(ValidationError::EmptyDateRange)?;
        let end = windows.iter().max().ok_or(ValidationError::EmptyDateRange)?;
        Ok(DateRange::Between {
            start: *start,
            end: *end,
        })
    }

    /// Parse a list of `YYYY-MM` strings; `["most recent"]` selects the latest month.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, ValidationError> {
        if let [only] = values {
            if only.as_ref().trim().eq_ignore_ascii_case("most recent") {
                return Ok(DateRange::MostRecent);
            }
        }
        let windows = values
            .iter()
            .map(|v| v.as_ref().parse())
            .collect::<Result<Vec<DateWindow>, _>>()?;
        Self::spanning(&windows)
    }

    /// Pick the months of `available` that fall in this range, in ascending order.
    pub fn select(&self, available: &[DateWindow]) -> Vec<DateWindow> {
        match self {
            DateRange::MostRecent => available.iter().max().copied().into_iter().collect(),
            DateRange::Between { start, end } => {
                let mut picked: Vec<DateWindow> = available
                    .iter()
                    .filter(|w| *w >= start && *w <= end)
                    .copied()
                    .collect();
                picked.sort();
                picked.dedup();
                picked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> DateWindow {
        s.parse().unwrap()
    }

    #[test]
    fn test_product_id_format() {
        assert!(ProductId::parse("DP3.30006.001").is_ok());
        assert!(ProductId::parse("DP1.10098.001").is_ok());
        assert_eq!(
            ProductId::parse("DP5.10098.001"),
            Err(ValidationError::InvalidProductId("DP5.10098.001".to_string()))
        );
        assert!(ProductId::parse("DP1.1009.001").is_err());
        assert!(ProductId::parse("DP1.10098.002").is_err());
        assert!(ProductId::parse("DP1x10098x001").is_err());
        assert!(ProductId::parse("DP1.10098.001.zip").is_err());
    }

    #[test]
    fn test_tabular_rejects_remote_sensing_and_phenocam() {
        assert_eq!(
            ProductId::parse_tabular("DP3.30006.001"),
            Err(ValidationError::RemoteSensingProduct("DP3.30006.001".to_string()))
        );
        assert_eq!(
            ProductId::parse_tabular("DP1.00033.001"),
            Err(ValidationError::PhenocamProduct("DP1.00033.001".to_string()))
        );
        assert_eq!(
            ProductId::parse_tabular("DP1.00042.001"),
            Err(ValidationError::PhenocamProduct("DP1.00042.001".to_string()))
        );
        assert_eq!(ProductId::parse_tabular("DP1.10098.001").unwrap().as_str(), "DP1.10098.001");
    }

    #[test]
    fn test_package() {
        assert_eq!("basic".parse::<Package>(), Ok(Package::Basic));
        assert_eq!("expanded".parse::<Package>(), Ok(Package::Expanded));
        assert_eq!(
            "full".parse::<Package>(),
            Err(ValidationError::InvalidPackage("full".to_string()))
        );
        assert!("Basic".parse::<Package>().is_err());
    }

    #[test]
    fn test_date_window_parse() {
        let d = w("2019-08");
        assert_eq!((d.year(), d.month()), (2019, 8));
        assert_eq!(d.to_string(), "2019-08");
        assert!("2019-8".parse::<DateWindow>().is_err());
        assert!("2019-13".parse::<DateWindow>().is_err());
        assert!("201908".parse::<DateWindow>().is_err());
        assert!("most recent".parse::<DateWindow>().is_err());
        assert!(DateWindow::new(2019, 0).is_err());
    }

    #[test]
    fn test_date_window_order() {
        assert!(w("2018-12") < w("2019-01"));
        assert!(w("2019-02") > w("2019-01"));
    }

    #[test]
    fn test_date_range_spanning_any_order() {
        let range = DateRange::parse(&["2020-10", "2019-10", "2020-01"]).unwrap();
        assert_eq!(
            range,
            DateRange::Between {
                start: w("2019-10"),
                end: w("2020-10")
            }
        );
        assert_eq!(DateRange::parse::<&str>(&[]), Err(ValidationError::EmptyDateRange));
        assert_eq!(DateRange::parse(&["most recent"]), Ok(DateRange::MostRecent));
    }

    #[test]
    fn test_date_range_select() {
        let available = [w("2016-07"), w("2017-09"), w("2019-08"), w("2018-08")];
        assert_eq!(DateRange::MostRecent.select(&available), [w("2019-08")]);
        assert!(DateRange::MostRecent.select(&[]).is_empty());

        let range = DateRange::parse(&["2017-01", "2018-12"]).unwrap();
        assert_eq!(range.select(&available), [w("2017-09"), w("2018-08")]);

        let single = DateRange::parse(&["2019-08"]).unwrap();
        assert_eq!(single.select(&available), [w("2019-08")]);
    }

    #[test]
    fn test_date_window_serde() {
        let json = serde_json::to_string(&w("2019-08")).unwrap();
        assert_eq!(json, "\"2019-08\"");
        let back: DateWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w("2019-08"));
        assert!(serde_json::from_str::<DateWindow>("\"2019/08\"").is_err());
    }
}
