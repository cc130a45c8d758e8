//! Model and output parameters for the forecaster.

use serde::Deserialize;

use crate::ForecastError;

/// Forecast model and output settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ForecastConfig {
    /// Trailing historical months included in each forecast output.
    pub history_points: usize,
    /// Series shorter than this are fitted with a warning.
    pub min_history: usize,
    /// Width of the prediction interval, in (0, 1).
    pub interval_width: f64,
    /// Prior scale of the trend changepoint magnitudes.
    pub changepoint_prior_scale: f64,
    /// Prior scale of the seasonal coefficients.
    pub seasonality_prior_scale: f64,
    /// Fourier order of the yearly seasonality.
    pub seasonality_order: usize,
    /// Upper bound on trend changepoints.
    pub max_changepoints: usize,
    /// Leading share of the history where changepoints may be placed.
    pub changepoint_range: f64,
    /// Alternating trend/seasonality refinement passes.
    pub iterations: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            history_points: 3,
            min_history: 12,
            interval_width: 0.95,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            seasonality_order: 5,
            max_changepoints: 25,
            changepoint_range: 0.8,
            iterations: 8,
        }
    }
}

impl ForecastConfig {
    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ForecastError> {
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ForecastError::Config(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        if self.changepoint_prior_scale <= 0.0 || self.seasonality_prior_scale <= 0.0 {
            return Err(ForecastError::Config(
                "prior scales must be positive".to_string(),
            ));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ForecastError::Config(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        if self.iterations == 0 {
            return Err(ForecastError::Config(
                "iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Normal quantile for the two-sided interval.
    #[must_use]
    pub fn z_score(&self) -> f64 {
        match self.interval_width {
            x if x >= 0.99 => 2.576,
            x if x >= 0.95 => 1.96,
            x if x >= 0.90 => 1.645,
            x if x >= 0.80 => 1.282,
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.z_score() - 1.96).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_bad_ranges() {
        for config in [
            ForecastConfig {
                interval_width: 1.0,
                ..ForecastConfig::default()
            },
            ForecastConfig {
                changepoint_prior_scale: 0.0,
                ..ForecastConfig::default()
            },
            ForecastConfig {
                changepoint_range: 0.0,
                ..ForecastConfig::default()
            },
            ForecastConfig {
                iterations: 0,
                ..ForecastConfig::default()
            },
        ] {
            assert!(matches!(config.validate(), Err(ForecastError::Config(_))));
        }
    }

    #[test]
    fn wider_intervals_use_larger_quantiles() {
        let z = |interval_width| {
            ForecastConfig {
                interval_width,
                ..ForecastConfig::default()
            }
            .z_score()
        };
        assert!(z(0.99) > z(0.95));
        assert!(z(0.95) > z(0.90));
        assert!(z(0.80) > z(0.5));
    }
}
