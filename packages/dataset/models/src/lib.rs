#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Table types for the synthesized crime dataset.
//!
//! The loader produces an [`AnnualTable`] and a [`CategoryCountTable`];
//! the synthesis stages turn those into a [`CrimeDataset`] of
//! [`MonthlyRecord`]s that every read path consumes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use crime_forecast_crime_models::CrimeType;
use serde::{Deserialize, Serialize};

/// Pseudo-region label meaning "aggregate over every region".
pub const ALL_REGIONS: &str = "All Regions";

/// Per-region annual incident totals keyed by year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualRecord {
    /// Region name as it appears in the source table.
    pub region: String,
    /// Incident total for each covered year.
    pub totals: BTreeMap<i32, u64>,
}

impl AnnualRecord {
    /// Creates a record with no years populated.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            totals: BTreeMap::new(),
        }
    }

    /// Returns the total for `year`, if covered.
    #[must_use]
    pub fn total(&self, year: i32) -> Option<u64> {
        self.totals.get(&year).copied()
    }

    /// Earliest covered year.
    #[must_use]
    pub fn first_year(&self) -> Option<i32> {
        self.totals.keys().next().copied()
    }

    /// Latest covered year.
    #[must_use]
    pub fn last_year(&self) -> Option<i32> {
        self.totals.keys().next_back().copied()
    }
}

/// The real annual window as loaded from the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualTable {
    /// One record per region, in source order.
    pub records: Vec<AnnualRecord>,
    /// First real year (inclusive).
    pub first_year: i32,
    /// Last real year (inclusive).
    pub last_year: i32,
}

impl AnnualTable {
    /// Iterates the real years in ascending order.
    #[must_use]
    pub const fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.first_year..=self.last_year
    }
}

/// One row of the categorical-count table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCountRow {
    /// Row label (usually a city or secondary region unit).
    pub label: String,
    /// Count per raw category label. Blank cells are absent.
    pub counts: BTreeMap<String, u64>,
}

/// The categorical-count table: rows of raw-label counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCountTable {
    /// Raw category labels in header order.
    pub labels: Vec<String>,
    /// Table rows.
    pub rows: Vec<CategoryCountRow>,
}

impl CategoryCountTable {
    /// Sums each raw label across every row.
    #[must_use]
    pub fn label_totals(&self) -> BTreeMap<&str, u64> {
        let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
        for row in &self.rows {
            for (label, count) in &row.counts {
                *totals.entry(label.as_str()).or_default() += count;
            }
        }
        totals
    }
}

/// A single synthesized month for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    /// Region name.
    pub region: String,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Total incidents in the month.
    pub total: u64,
    /// Incidents per canonical crime type.
    pub categories: BTreeMap<CrimeType, u64>,
}

impl MonthlyRecord {
    /// First day of the record's month.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Count for a single crime type (0 when absent).
    #[must_use]
    pub fn category(&self, crime_type: CrimeType) -> u64 {
        self.categories.get(&crime_type).copied().unwrap_or_default()
    }

    /// Sum of every category count.
    #[must_use]
    pub fn category_sum(&self) -> u64 {
        self.categories.values().sum()
    }
}

/// Global share of each canonical crime type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryProportions(pub BTreeMap<CrimeType, f64>);

impl CategoryProportions {
    /// Share of `crime_type`, 0.0 when absent.
    #[must_use]
    pub fn get(&self, crime_type: CrimeType) -> f64 {
        self.0.get(&crime_type).copied().unwrap_or_default()
    }

    /// Iterates `(crime type, share)` pairs in taxonomy order.
    pub fn iter(&self) -> impl Iterator<Item = (CrimeType, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Sum of every share. Should be 1.0 within float tolerance.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

/// A region-year whose monthly totals do not add up to its annual total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMismatch {
    /// Region name.
    pub region: String,
    /// Year checked.
    pub year: i32,
    /// Annual total from the extended annual series.
    pub expected: u64,
    /// Sum of the synthesized months.
    pub actual: u64,
}

/// Outcome of reconciling the monthly records against their sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Number of full region-years compared.
    pub years_checked: usize,
    /// Region-years outside the tolerance.
    pub mismatches: Vec<ValidationMismatch>,
    /// Records whose category counts drift further from the total than
    /// truncation allows.
    pub category_drift: usize,
}

impl ValidationReport {
    /// Whether every check passed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.category_drift == 0
    }
}

/// The canonical synthesized dataset.
///
/// Built once by the synthesis pipeline and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeDataset {
    /// Extended annual series per region.
    pub annual: Vec<AnnualRecord>,
    /// Monthly records, region-major and chronological within a region.
    pub records: Vec<MonthlyRecord>,
    /// Global category mix applied to every record.
    pub proportions: CategoryProportions,
    /// Build-time reconciliation results.
    pub validation: ValidationReport,
}

impl CrimeDataset {
    /// Sorted, de-duplicated region names.
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.region.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether any record belongs to `region`.
    #[must_use]
    pub fn has_region(&self, region: &str) -> bool {
        self.records.iter().any(|r| r.region == region)
    }

    /// Records of a single region, chronological.
    pub fn records_for_region<'a>(
        &'a self,
        region: &'a str,
    ) -> impl Iterator<Item = &'a MonthlyRecord> + 'a {
        self.records.iter().filter(move |r| r.region == region)
    }
}
