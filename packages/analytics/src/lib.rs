#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Read-only query layer over the synthesized crime dataset.
//!
//! Every function here is pure: it takes the dataset by reference, applies
//! the region, year and crime type filters of an [`IncidentQuery`] and
//! returns typed results. Unknown regions never fail; they yield empty
//! results or zero totals.

pub mod queries;

pub use crime_forecast_analytics_models::{
    CategoryCount, IncidentQuery, IncidentRecord, IncidentStats, RegionFilter, RegionalSummary,
    RiskTier, TrendPoint, YearFilter,
};
pub use queries::{
    crime_type_distribution, crime_type_series, incident_stats, list_categories, list_regions,
    parse_year_filter, query, region_series, regional_distribution, risk_tier, trend,
};
