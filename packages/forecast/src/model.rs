//! Piecewise-linear trend with multiplicative yearly seasonality.
//!
//! The model is `y(t) = g(t) * (1 + s(t))` where `g` is a linear trend
//! with rate changes at fixed changepoints and `s` is a Fourier series
//! over the day of the year. Time is rescaled so the history spans
//! `[0, 1]` and values are divided by the largest magnitude before fitting.
//!
//! Trend and seasonal coefficients are fitted alternately by penalized
//! least squares. The penalties play the role of Gaussian priors whose
//! scales come from [`ForecastConfig`], weighted by the current residual
//! variance.

use std::collections::BTreeSet;
use std::f64::consts::TAU;

use chrono::{Datelike as _, Months, NaiveDate};
use crime_forecast_analytics::TrendPoint;
use crime_forecast_forecast_models::{ForecastHorizon, ForecastPoint};

use crate::config::ForecastConfig;
use crate::{ForecastError, linalg};

const YEAR_DAYS: f64 = 365.25;
const TREND_PRIOR_SCALE: f64 = 5.0;
const MIN_VARIANCE: f64 = 1e-6;

/// A dated observation of a monthly series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// First day of the month.
    pub date: NaiveDate,
    /// Observed value.
    pub value: f64,
}

impl From<TrendPoint> for Observation {
    #[allow(clippy::cast_precision_loss)]
    fn from(point: TrendPoint) -> Self {
        Self {
            date: point.date,
            value: point.incidents as f64,
        }
    }
}

/// Point prediction with interval bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Expected value.
    pub yhat: f64,
    /// Lower interval bound.
    pub lower: f64,
    /// Upper interval bound.
    pub upper: f64,
}

/// A fitted trend and seasonality model.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    start: NaiveDate,
    span_days: f64,
    scale: f64,
    changepoints: Vec<f64>,
    rate: f64,
    offset: f64,
    deltas: Vec<f64>,
    seasonal: Vec<f64>,
    order: usize,
    residual_sd: f64,
    mean_abs_delta: f64,
    z: f64,
}

#[allow(clippy::cast_precision_loss)]
fn fourier(date: NaiveDate, order: usize) -> Vec<f64> {
    let day = f64::from(date.num_days_from_ce());
    (1..=order)
        .flat_map(|r| {
            let x = TAU * r as f64 * day / YEAR_DAYS;
            [x.sin(), x.cos()]
        })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Population standard deviation.
#[allow(clippy::cast_precision_loss)]
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Changepoint times: evenly spaced over the leading `range` share of the
/// history, skipping the first observation.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn place_changepoints(times: &[f64], range: f64, max: usize) -> Vec<f64> {
    let window = (times.len() as f64 * range).floor() as usize;
    let count = max.min(window.saturating_sub(1));
    if count == 0 {
        return vec![];
    }
    (1..=count)
        .map(|j| {
            let index = (j as f64 * (window - 1) as f64 / count as f64).round() as usize;
            times[index.min(times.len() - 1)]
        })
        .collect()
}

impl FittedModel {
    /// Fits the model to `observations`, which must be chronological.
    ///
    /// # Errors
    ///
    /// * [`ForecastError::EmptySeries`] if there are no observations
    /// * [`ForecastError::SingularFit`] if a least-squares system cannot be
    ///   solved
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(observations: &[Observation], config: &ForecastConfig) -> Result<Self, ForecastError> {
        let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
            return Err(ForecastError::EmptySeries);
        };

        let start = first.date;
        let span_days = match (last.date - start).num_days() {
            days if days > 0 => days as f64,
            _ => 1.0,
        };
        let scale = observations
            .iter()
            .map(|o| o.value.abs())
            .fold(0.0, f64::max);
        let scale = if scale > 0.0 { scale } else { 1.0 };

        let times: Vec<f64> = observations
            .iter()
            .map(|o| (o.date - start).num_days() as f64 / span_days)
            .collect();
        let targets: Vec<f64> = observations.iter().map(|o| o.value / scale).collect();
        let features: Vec<Vec<f64>> = observations
            .iter()
            .map(|o| fourier(o.date, config.seasonality_order))
            .collect();
        let changepoints =
            place_changepoints(&times, config.changepoint_range, config.max_changepoints);

        let mut model = Self {
            start,
            span_days,
            scale,
            changepoints,
            rate: 0.0,
            offset: 0.0,
            deltas: vec![],
            seasonal: vec![0.0; 2 * config.seasonality_order],
            order: config.seasonality_order,
            residual_sd: 0.0,
            mean_abs_delta: 0.0,
            z: config.z_score(),
        };

        let mut noise = std_dev(&targets).powi(2).max(MIN_VARIANCE);
        let mut residuals = vec![0.0; targets.len()];

        for _ in 0..config.iterations {
            // Trend pass with the seasonal multiplier held fixed.
            let trend_rows: Vec<Vec<f64>> = times
                .iter()
                .zip(&features)
                .map(|(t, x)| {
                    let multiplier = 1.0 + dot(x, &model.seasonal);
                    let mut row = vec![t * multiplier, multiplier];
                    row.extend(
                        model
                            .changepoints
                            .iter()
                            .map(|c| (t - c).max(0.0) * multiplier),
                    );
                    row
                })
                .collect();
            let mut penalty = vec![noise / TREND_PRIOR_SCALE.powi(2); 2];
            penalty.extend(std::iter::repeat_n(
                noise / config.changepoint_prior_scale.powi(2),
                model.changepoints.len(),
            ));
            let theta =
                linalg::ridge(&trend_rows, &targets, &penalty).ok_or(ForecastError::SingularFit)?;
            model.rate = theta[0];
            model.offset = theta[1];
            model.deltas = theta[2..].to_vec();

            // Seasonal pass with the trend held fixed.
            let trend: Vec<f64> = times.iter().map(|t| model.trend(*t)).collect();
            let seasonal_rows: Vec<Vec<f64>> = features
                .iter()
                .zip(&trend)
                .map(|(x, g)| x.iter().map(|v| v * g).collect())
                .collect();
            let seasonal_targets: Vec<f64> =
                targets.iter().zip(&trend).map(|(y, g)| y - g).collect();
            let penalty =
                vec![noise / config.seasonality_prior_scale.powi(2); model.seasonal.len()];
            model.seasonal = linalg::ridge(&seasonal_rows, &seasonal_targets, &penalty)
                .ok_or(ForecastError::SingularFit)?;

            for (((residual, y), g), x) in residuals.iter_mut().zip(&targets).zip(&trend).zip(&features) {
                *residual = y - g * (1.0 + dot(x, &model.seasonal));
            }
            noise = (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64)
                .max(MIN_VARIANCE);
        }

        model.residual_sd = std_dev(&residuals) * scale;
        model.mean_abs_delta = if model.deltas.is_empty() {
            0.0
        } else {
            model.deltas.iter().map(|d| d.abs()).sum::<f64>() / model.deltas.len() as f64
        };

        Ok(model)
    }

    #[allow(clippy::cast_precision_loss)]
    fn time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    fn trend(&self, t: f64) -> f64 {
        self.rate * t
            + self.offset
            + self
                .changepoints
                .iter()
                .zip(&self.deltas)
                .map(|(c, d)| d * (t - c).max(0.0))
                .sum::<f64>()
    }

    /// Multiplier applied to the trend at `date`.
    #[must_use]
    pub fn seasonal_multiplier(&self, date: NaiveDate) -> f64 {
        1.0 + dot(&fourier(date, self.order), &self.seasonal)
    }

    /// Trend variance beyond the history, in scaled units.
    ///
    /// Future changepoints arrive at the historical rate with magnitudes
    /// distributed like the fitted ones; integrating their effect over the
    /// horizon gives a variance growing with its cube.
    #[allow(clippy::cast_precision_loss)]
    fn trend_variance(&self, t: f64) -> f64 {
        let ahead = t - 1.0;
        if ahead <= 0.0 {
            return 0.0;
        }
        let rate = self.changepoints.len() as f64;
        rate * 2.0 * self.mean_abs_delta.powi(2) * ahead.powi(3) / 3.0
    }

    /// Predicts the value at `date` with its interval.
    #[must_use]
    pub fn predict(&self, date: NaiveDate) -> Prediction {
        let t = self.time(date);
        let multiplier = self.seasonal_multiplier(date);
        let yhat = self.scale * self.trend(t) * multiplier;

        let trend_sd = self.scale * multiplier.abs() * self.trend_variance(t).sqrt();
        let half_width = self.z * self.residual_sd.hypot(trend_sd);

        Prediction {
            yhat,
            lower: yhat - half_width,
            upper: yhat + half_width,
        }
    }

    /// Standard deviation of the in-sample residuals.
    #[must_use]
    pub const fn residual_sd(&self) -> f64 {
        self.residual_sd
    }

    /// Number of trend changepoints.
    #[must_use]
    pub fn changepoint_count(&self) -> usize {
        self.changepoints.len()
    }
}

fn month_label(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Fits `series` and returns the trailing history followed by `horizon`
/// future months.
///
/// History points carry the observed value and the in-sample fit; future
/// points start the month after the last observation and are clamped at
/// zero. Values truncate toward zero. An empty series yields no points.
///
/// # Errors
///
/// Returns [`ForecastError`] if the model cannot be fitted or a future
/// month is out of the calendar range.
pub fn forecast(
    series: &[Observation],
    horizon: ForecastHorizon,
    config: &ForecastConfig,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    forecast_with_model(series, horizon, config).map(|(points, _)| points)
}

/// Like [`forecast`], also returning the fitted model. The model is `None`
/// for an empty series.
///
/// # Errors
///
/// Returns [`ForecastError`] if the model cannot be fitted or a future
/// month is out of the calendar range.
#[allow(clippy::cast_possible_truncation)]
pub fn forecast_with_model(
    series: &[Observation],
    horizon: ForecastHorizon,
    config: &ForecastConfig,
) -> Result<(Vec<ForecastPoint>, Option<FittedModel>), ForecastError> {
    if series.is_empty() {
        return Ok((vec![], None));
    }

    let mut series = series.to_vec();
    series.sort_by_key(|o| o.date);

    if series.len() < config.min_history {
        log::warn!(
            "Only {} data points, forecasts work best with {}+",
            series.len(),
            config.min_history
        );
    }

    let model = FittedModel::fit(&series, config)?;
    log::info!(
        "Fitted {} points with {} changepoints (residual sd {:.2})",
        series.len(),
        model.changepoint_count(),
        model.residual_sd()
    );

    let mut seen = BTreeSet::new();
    let mut points = Vec::with_capacity(config.history_points + horizon.months() as usize);

    for observation in &series[series.len().saturating_sub(config.history_points)..] {
        let label = month_label(observation.date);
        if !seen.insert(label.clone()) {
            continue;
        }
        let prediction = model.predict(observation.date);
        points.push(ForecastPoint {
            date: label,
            actual: Some(observation.value as i64),
            predicted: prediction.yhat as i64,
            lower: prediction.lower as i64,
            upper: prediction.upper as i64,
        });
    }

    let last = series[series.len() - 1].date;
    let last_month = last.with_day(1).ok_or(ForecastError::DateOverflow(last))?;

    for step in 1..=horizon.months() {
        let date = last_month
            .checked_add_months(Months::new(step))
            .ok_or(ForecastError::DateOverflow(last_month))?;
        let label = month_label(date);
        if !seen.insert(label.clone()) {
            continue;
        }
        let prediction = model.predict(date);
        points.push(ForecastPoint {
            date: label,
            actual: None,
            predicted: (prediction.yhat as i64).max(0),
            lower: (prediction.lower as i64).max(0),
            upper: (prediction.upper as i64).max(0),
        });
    }

    Ok((points, Some(model)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monthly(start_year: i32, values: &[f64]) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap();
        values
            .iter()
            .zip(0u32..)
            .map(|(value, i)| Observation {
                date: start.checked_add_months(Months::new(i)).unwrap(),
                value: *value,
            })
            .collect()
    }

    fn horizon(months: u32) -> ForecastHorizon {
        ForecastHorizon::try_from(months).unwrap()
    }

    #[test]
    fn empty_series_has_no_points() {
        let points = forecast(&[], horizon(6), &ForecastConfig::default()).unwrap();
        assert!(points.is_empty());
        assert!(matches!(
            FittedModel::fit(&[], &ForecastConfig::default()),
            Err(ForecastError::EmptySeries)
        ));
    }

    #[test]
    fn output_layout_and_labels() {
        let series = monthly(2016, &[500.0; 114]);
        let points = forecast(&series, horizon(6), &ForecastConfig::default()).unwrap();
        assert_eq!(points.len(), 3 + 6);

        let labels: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "2025-04", "2025-05", "2025-06", "2025-07", "2025-08", "2025-09", "2025-10",
                "2025-11", "2025-12"
            ]
        );
        assert!(points[..3].iter().all(|p| p.actual == Some(500)));
        assert!(points[3..].iter().all(|p| p.actual.is_none()));
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn returned_model_reproduces_the_points() {
        let series = monthly(2020, &[120.0; 24]);
        let (points, model) =
            forecast_with_model(&series, horizon(2), &ForecastConfig::default()).unwrap();
        let model = model.unwrap();
        let next = model.predict(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(points[3].predicted, (next.yhat as i64).max(0));

        let (points, model) =
            forecast_with_model(&[], horizon(2), &ForecastConfig::default()).unwrap();
        assert!(points.is_empty());
        assert!(model.is_none());
    }

    #[test]
    fn future_crosses_year_boundary() {
        let series = monthly(2020, &[100.0; 24]);
        let points = forecast(&series, horizon(3), &ForecastConfig::default()).unwrap();
        let future: Vec<&str> = points[3..].iter().map(|p| p.date.as_str()).collect();
        assert_eq!(future, vec!["2022-01", "2022-02", "2022-03"]);
    }

    #[test]
    fn constant_series_forecasts_its_level() {
        let series = monthly(2018, &[400.0; 48]);
        let points = forecast(&series, horizon(12), &ForecastConfig::default()).unwrap();
        for point in &points[3..] {
            assert!(
                (point.predicted - 400).abs() <= 8,
                "{} predicted {}",
                point.date,
                point.predicted
            );
            assert!(point.lower <= point.predicted && point.predicted <= point.upper);
        }
    }

    #[test]
    fn linear_growth_is_extrapolated() {
        let values: Vec<f64> = (0..48).map(|i| 200.0 + 10.0 * f64::from(i)).collect();
        let points = forecast(&monthly(2018, &values), horizon(6), &ForecastConfig::default())
            .unwrap();
        let future: Vec<i64> = points[3..].iter().map(|p| p.predicted).collect();
        assert!(future.windows(2).all(|w| w[1] > w[0]), "{future:?}");
        // The first future month continues the line at about 680.
        assert!((future[0] - 680).abs() <= 20, "{future:?}");
    }

    #[test]
    fn yearly_seasonality_is_learned() {
        let values: Vec<f64> = (0..60)
            .map(|i| 1000.0 * (1.0 + 0.3 * (TAU * f64::from(i % 12) / 12.0).sin()))
            .collect();
        let series = monthly(2019, &values);
        let model = FittedModel::fit(&series, &ForecastConfig::default()).unwrap();

        let peak = model.predict(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()).yhat;
        let trough = model.predict(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()).yhat;
        assert!(peak > 1150.0, "peak {peak}");
        assert!(trough < 850.0, "trough {trough}");
    }

    #[test]
    fn declining_series_is_clamped_at_zero() {
        let values: Vec<f64> = (0..36).map(|i| 3600.0 - 100.0 * f64::from(i)).collect();
        let points = forecast(&monthly(2020, &values), horizon(24), &ForecastConfig::default())
            .unwrap();
        for point in &points[3..] {
            assert!(point.predicted >= 0 && point.lower >= 0 && point.upper >= 0);
        }
        assert_eq!(points.last().unwrap().predicted, 0);
    }

    #[test]
    fn short_series_still_forecasts() {
        let points = forecast(&monthly(2024, &[42.0]), horizon(2), &ForecastConfig::default())
            .unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].actual, Some(42));

        let points = forecast(
            &monthly(2024, &[10.0, 12.0, 11.0, 13.0]),
            horizon(1),
            &ForecastConfig::default(),
        )
        .unwrap();
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn zero_series_stays_zero() {
        let points = forecast(&monthly(2020, &[0.0; 24]), horizon(4), &ForecastConfig::default())
            .unwrap();
        assert!(points.iter().all(|p| p.predicted == 0 && p.lower == 0 && p.upper == 0));
    }

    #[test]
    fn fitting_is_deterministic() {
        let values: Vec<f64> = (0..40).map(|i| 300.0 + f64::from((i * 37) % 23)).collect();
        let series = monthly(2021, &values);
        let a = forecast(&series, horizon(8), &ForecastConfig::default()).unwrap();
        let b = forecast(&series, horizon(8), &ForecastConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unsorted_input_is_ordered_first() {
        let mut series = monthly(2020, &(0..24).map(f64::from).collect::<Vec<_>>());
        let sorted = forecast(&series, horizon(2), &ForecastConfig::default()).unwrap();
        series.reverse();
        let reversed = forecast(&series, horizon(2), &ForecastConfig::default()).unwrap();
        assert_eq!(sorted, reversed);
    }

    #[test]
    fn intervals_widen_beyond_a_trend_change() {
        let values: Vec<f64> = (0..48)
            .map(|i| if i < 24 { 500.0 } else { 500.0 + 40.0 * f64::from(i - 24) })
            .collect();
        let series = monthly(2018, &values);
        let model = FittedModel::fit(&series, &ForecastConfig::default()).unwrap();

        let width = |date: NaiveDate| {
            let p = model.predict(date);
            p.upper - p.lower
        };
        let near = width(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        let far = width(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert!(far > near, "near {near} far {far}");
    }

    #[test]
    fn changepoints_cover_leading_history() {
        let times: Vec<f64> = (0..100).map(|i| f64::from(i) / 99.0).collect();
        let changepoints = place_changepoints(&times, 0.8, 25);
        assert_eq!(changepoints.len(), 25);
        assert!(changepoints.iter().all(|c| *c > 0.0 && *c < 0.81));
        assert!(place_changepoints(&times[..1], 0.8, 25).is_empty());
        assert_eq!(place_changepoints(&times[..10], 0.8, 25).len(), 7);
    }
}
