#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for monthly incident forecasts.

use crime_forecast_crime_models::CrimeType;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One month of a forecast.
///
/// Historical months carry the observed `actual` value next to the fitted
/// one; future months have `actual == None` and non-negative bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// Month label, `YYYY-MM`.
    pub date: String,
    /// Observed value for historical months.
    pub actual: Option<i64>,
    /// Point prediction.
    pub predicted: i64,
    /// Lower interval bound.
    pub lower: i64,
    /// Upper interval bound.
    pub upper: i64,
}

impl ForecastPoint {
    /// Whether this point lies beyond the observed history.
    #[must_use]
    pub const fn is_future(&self) -> bool {
        self.actual.is_none()
    }
}

/// Direction of the forecast horizon.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrendDirection {
    /// The last future prediction exceeds the first.
    Increasing,
    /// Anything else, including single-month horizons.
    Stable,
}

/// Summary of the future part of a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ForecastSummary {
    /// Prediction for the first future month.
    pub next_month: i64,
    /// Mean of future predictions, truncated.
    pub avg_forecast: i64,
    /// Largest future prediction.
    pub max_forecast: i64,
    /// Smallest future prediction.
    pub min_forecast: i64,
    /// Direction over the horizon.
    pub trend: TrendDirection,
}

impl ForecastSummary {
    /// Summarizes the future points of `points`. Returns `None` when there
    /// are none.
    #[must_use]
    pub fn from_points(points: &[ForecastPoint]) -> Option<Self> {
        let future: Vec<i64> = points
            .iter()
            .filter(|p| p.is_future())
            .map(|p| p.predicted)
            .collect();

        let (first, last) = (*future.first()?, *future.last()?);
        let sum: i64 = future.iter().sum();
        let count = i64::try_from(future.len()).ok()?;

        Some(Self {
            next_month: first,
            avg_forecast: sum / count,
            max_forecast: future.iter().copied().max()?,
            min_forecast: future.iter().copied().min()?,
            trend: if future.len() > 1 && last > first {
                TrendDirection::Increasing
            } else {
                TrendDirection::Stable
            },
        })
    }
}

/// Number of future months to forecast, validated to
/// [`ForecastHorizon::MIN`]..=[`ForecastHorizon::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ForecastHorizon(u32);

impl ForecastHorizon {
    /// Shortest accepted horizon.
    pub const MIN: u32 = 1;
    /// Longest accepted horizon.
    pub const MAX: u32 = 24;
    /// Horizon used when none is requested.
    pub const DEFAULT: Self = Self(6);

    /// Number of months.
    #[must_use]
    pub const fn months(self) -> u32 {
        self.0
    }
}

impl Default for ForecastHorizon {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for ForecastHorizon {
    type Error = InvalidPeriodsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidPeriodsError { value })
        }
    }
}

impl From<ForecastHorizon> for u32 {
    fn from(value: ForecastHorizon) -> Self {
        value.0
    }
}

impl std::fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned for a forecast horizon outside the accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPeriodsError {
    /// The rejected number of periods.
    pub value: u32,
}

impl std::fmt::Display for InvalidPeriodsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid periods {}: must be between {} and {}",
            self.value,
            ForecastHorizon::MIN,
            ForecastHorizon::MAX
        )
    }
}

impl std::error::Error for InvalidPeriodsError {}

/// Identifies a forecast for memoization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastKey {
    /// Region label, including the all-regions pseudo label.
    pub region: String,
    /// Forecast horizon.
    pub periods: ForecastHorizon,
    /// Crime type for per-category forecasts.
    pub crime_type: Option<CrimeType>,
}

impl ForecastKey {
    /// Key of a region-level forecast.
    #[must_use]
    pub fn region(region: impl Into<String>, periods: ForecastHorizon) -> Self {
        Self {
            region: region.into(),
            periods,
            crime_type: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, actual: Option<i64>, predicted: i64) -> ForecastPoint {
        ForecastPoint {
            date: date.to_string(),
            actual,
            predicted,
            lower: predicted - 5,
            upper: predicted + 5,
        }
    }

    #[test]
    fn summary_covers_future_points_only() {
        let points = vec![
            point("2025-05", Some(900), 880),
            point("2025-06", Some(950), 940),
            point("2025-07", None, 100),
            point("2025-08", None, 130),
            point("2025-09", None, 121),
        ];
        let summary = ForecastSummary::from_points(&points).unwrap();
        assert_eq!(summary.next_month, 100);
        assert_eq!(summary.avg_forecast, 117);
        assert_eq!(summary.max_forecast, 130);
        assert_eq!(summary.min_forecast, 100);
        assert_eq!(summary.trend, TrendDirection::Increasing);
    }

    #[test]
    fn summary_trend_is_stable_unless_last_exceeds_first() {
        let flat = [point("2025-07", None, 100), point("2025-08", None, 100)];
        assert_eq!(
            ForecastSummary::from_points(&flat).unwrap().trend,
            TrendDirection::Stable
        );
        let single = [point("2025-07", None, 100)];
        assert_eq!(
            ForecastSummary::from_points(&single).unwrap().trend,
            TrendDirection::Stable
        );
    }

    #[test]
    fn summary_of_history_only_is_none() {
        assert!(ForecastSummary::from_points(&[]).is_none());
        assert!(ForecastSummary::from_points(&[point("2025-01", Some(3), 3)]).is_none());
    }

    #[test]
    fn horizon_bounds() {
        assert!(ForecastHorizon::try_from(0).is_err());
        assert_eq!(ForecastHorizon::try_from(1).unwrap().months(), 1);
        assert_eq!(ForecastHorizon::try_from(24).unwrap().months(), 24);
        assert_eq!(
            ForecastHorizon::try_from(25),
            Err(InvalidPeriodsError { value: 25 })
        );
        assert_eq!(ForecastHorizon::default().months(), 6);
    }

    #[test]
    fn serialized_shapes() {
        let json = serde_json::to_value(point("2025-07", None, 10)).unwrap();
        assert!(json["actual"].is_null());
        assert_eq!(json["date"], "2025-07");

        let summary = ForecastSummary::from_points(&[point("2025-07", None, 10)]).unwrap();
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["next_month"], 10);
        assert_eq!(json["trend"], "stable");

        assert!(serde_json::from_str::<ForecastHorizon>("30").is_err());
    }

    #[test]
    fn keys_distinguish_category() {
        let horizon = ForecastHorizon::DEFAULT;
        let region = ForecastKey::region("Goa", horizon);
        let typed = ForecastKey {
            crime_type: Some(CrimeType::Malware),
            ..region.clone()
        };
        assert_ne!(region, typed);
    }
}
