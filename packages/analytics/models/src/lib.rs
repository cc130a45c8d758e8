#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query filters and result types for the analytics layer.
//!
//! Filters parse the string forms used by API consumers (`"All Regions"`,
//! `"all"`, `"All Types"`); results serialize in camelCase for the same
//! consumers.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use crime_forecast_crime_models::CrimeType;
use crime_forecast_dataset_models::ALL_REGIONS;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Regional scope of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegionFilter {
    /// Sum across every region.
    #[default]
    All,
    /// A single named region.
    Region(String),
}

impl RegionFilter {
    /// Parses a region label. [`ALL_REGIONS`] and blank input select every
    /// region; anything else names a single region.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label == ALL_REGIONS {
            Self::All
        } else {
            Self::Region(label.to_string())
        }
    }

    /// The label this filter parses from.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::All => ALL_REGIONS,
            Self::Region(name) => name,
        }
    }
}

impl From<String> for RegionFilter {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for RegionFilter {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<RegionFilter> for String {
    fn from(value: RegionFilter) -> Self {
        value.label().to_string()
    }
}

impl std::fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Year scope of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearFilter {
    /// No year restriction.
    #[default]
    All,
    /// A single calendar year.
    Year(i32),
}

impl YearFilter {
    /// Whether `year` passes this filter.
    #[must_use]
    pub const fn matches(self, year: i32) -> bool {
        match self {
            Self::All => true,
            Self::Year(y) => y == year,
        }
    }
}

/// Error returned when a year filter string is neither `"all"` nor a year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidYearFilterError {
    /// The rejected input.
    pub value: String,
}

impl std::fmt::Display for InvalidYearFilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid year filter '{}': expected 'all' or a year", self.value)
    }
}

impl std::error::Error for InvalidYearFilterError {}

impl FromStr for YearFilter {
    type Err = InvalidYearFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<i32>()
            .map(Self::Year)
            .map_err(|_| InvalidYearFilterError {
                value: s.to_string(),
            })
    }
}

/// Coarse risk classification of an incident total.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum RiskTier {
    /// At or below the moderate threshold
    Low,
    /// Above the moderate threshold
    Moderate,
    /// Above the high threshold
    High,
}

impl RiskTier {
    /// Aggregate total above which a scope is [`RiskTier::High`].
    pub const HIGH_TOTAL: u64 = 3500;
    /// Aggregate total above which a scope is [`RiskTier::Moderate`].
    pub const MODERATE_TOTAL: u64 = 2000;
    /// Monthly average above which a scope is [`RiskTier::High`].
    pub const HIGH_MONTHLY: f64 = 1500.0;
    /// Monthly average above which a scope is [`RiskTier::Moderate`].
    pub const MODERATE_MONTHLY: f64 = 1000.0;

    /// Classifies an aggregate incident total.
    #[must_use]
    pub const fn from_total(total: u64) -> Self {
        if total > Self::HIGH_TOTAL {
            Self::High
        } else if total > Self::MODERATE_TOTAL {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Classifies an average monthly incident count.
    #[must_use]
    pub fn from_monthly_average(average: f64) -> Self {
        if average > Self::HIGH_MONTHLY {
            Self::High
        } else if average > Self::MODERATE_MONTHLY {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// Filters shared by every incident query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentQuery {
    /// Regional scope.
    pub region: RegionFilter,
    /// Year scope.
    pub year: YearFilter,
    /// Restrict counts to one crime type. `None` means every type.
    pub crime_type: Option<CrimeType>,
}

impl IncidentQuery {
    /// Query over one region and year scope, every crime type.
    #[must_use]
    pub const fn new(region: RegionFilter, year: YearFilter) -> Self {
        Self {
            region,
            year,
            crime_type: None,
        }
    }

    /// Restricts the query to one crime type.
    #[must_use]
    pub const fn with_crime_type(mut self, crime_type: Option<CrimeType>) -> Self {
        self.crime_type = crime_type;
        self
    }
}

/// One month of incidents for the selected scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// First day of the month.
    pub date: NaiveDate,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Total incidents.
    pub incidents: u64,
    /// Incidents per crime type, flattened into the record.
    #[serde(flatten)]
    pub categories: BTreeMap<CrimeType, u64>,
}

impl IncidentRecord {
    /// The record's value under an optional crime type restriction.
    #[must_use]
    pub fn value(&self, crime_type: Option<CrimeType>) -> u64 {
        crime_type.map_or(self.incidents, |t| {
            self.categories.get(&t).copied().unwrap_or_default()
        })
    }
}

/// A point of a monthly incident trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// First day of the month.
    pub date: NaiveDate,
    /// Incident count.
    pub incidents: u64,
}

/// Total incidents of one crime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Crime type.
    #[serde(rename = "type")]
    pub crime_type: CrimeType,
    /// Incident count.
    pub count: u64,
}

/// Total incidents and risk tier of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalSummary {
    /// Region name.
    pub region: String,
    /// Incident total for the year scope.
    pub incidents: u64,
    /// Risk tier of `incidents`.
    pub risk: RiskTier,
}

/// Headline statistics for a query scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentStats {
    /// Total incidents.
    pub total_incidents: u64,
    /// Crime type with the most incidents, or the filtered type.
    pub most_common_type: CrimeType,
    /// Region with the most incidents, or the selected region.
    pub top_region: String,
    /// Risk tier of the average month.
    pub risk_level: RiskTier,
    /// Average incidents per month, truncated.
    pub avg_monthly: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_tier_boundaries() {
        assert_eq!(RiskTier::from_total(2000), RiskTier::Low);
        assert_eq!(RiskTier::from_total(2001), RiskTier::Moderate);
        assert_eq!(RiskTier::from_total(3500), RiskTier::Moderate);
        assert_eq!(RiskTier::from_total(3501), RiskTier::High);
        assert_eq!(RiskTier::from_total(0), RiskTier::Low);
    }

    #[test]
    fn monthly_risk_boundaries() {
        assert_eq!(RiskTier::from_monthly_average(1000.0), RiskTier::Low);
        assert_eq!(RiskTier::from_monthly_average(1000.5), RiskTier::Moderate);
        assert_eq!(RiskTier::from_monthly_average(1500.0), RiskTier::Moderate);
        assert_eq!(RiskTier::from_monthly_average(1500.1), RiskTier::High);
    }

    #[test]
    fn region_filter_parses_pseudo_region() {
        assert_eq!(RegionFilter::parse("All Regions"), RegionFilter::All);
        assert_eq!(RegionFilter::parse(""), RegionFilter::All);
        assert_eq!(
            RegionFilter::parse(" Kerala "),
            RegionFilter::Region("Kerala".to_string())
        );
        assert_eq!(RegionFilter::All.to_string(), ALL_REGIONS);
    }

    #[test]
    fn year_filter_parsing() {
        assert_eq!("all".parse::<YearFilter>(), Ok(YearFilter::All));
        assert_eq!("ALL".parse::<YearFilter>(), Ok(YearFilter::All));
        assert_eq!("2024".parse::<YearFilter>(), Ok(YearFilter::Year(2024)));
        assert!("twenty".parse::<YearFilter>().is_err());
        assert!(YearFilter::All.matches(1999));
        assert!(!YearFilter::Year(2020).matches(2021));
    }

    #[test]
    fn incident_record_flattens_categories() {
        let record = IncidentRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            year: 2024,
            month: 3,
            incidents: 10,
            categories: BTreeMap::from([(CrimeType::UpiFraud, 4), (CrimeType::Malware, 6)]),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["incidents"], 10);
        assert_eq!(json["UPI Fraud"], 4);
        assert_eq!(record.value(Some(CrimeType::Malware)), 6);
        assert_eq!(record.value(Some(CrimeType::Phishing)), 0);
        assert_eq!(record.value(None), 10);
    }

    #[test]
    fn region_filter_serializes_as_label() {
        let json = serde_json::to_string(&RegionFilter::All).unwrap();
        assert_eq!(json, "\"All Regions\"");
        let parsed: RegionFilter = serde_json::from_str("\"Goa\"").unwrap();
        assert_eq!(parsed, RegionFilter::Region("Goa".to_string()));
    }
}
