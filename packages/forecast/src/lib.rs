#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Monthly incident forecasting.
//!
//! [`model`] fits a trend and yearly seasonality model to one series and
//! extends it. [`Forecaster`] draws series from a [`CrimeDataset`],
//! memoizes region forecasts and counts model fits.

pub mod config;
pub mod linalg;
pub mod model;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use crime_forecast_analytics::{RegionFilter, crime_type_series, region_series};
use crime_forecast_crime_models::CrimeType;
use crime_forecast_dataset_models::CrimeDataset;
use crime_forecast_forecast_models::{
    ForecastHorizon, ForecastKey, ForecastPoint, ForecastSummary, InvalidPeriodsError,
};

pub use config::ForecastConfig;
pub use model::{FittedModel, Observation, Prediction};

/// Errors that can occur while forecasting.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    /// The requested horizon is out of range.
    #[error(transparent)]
    InvalidPeriods(#[from] InvalidPeriodsError),

    /// The forecast parameters are inconsistent.
    #[error("Invalid forecast config: {0}")]
    Config(String),

    /// A model was asked to fit no observations.
    #[error("Cannot fit an empty series")]
    EmptySeries,

    /// A least-squares system had no unique solution.
    #[error("Model fit is singular")]
    SingularFit,

    /// A forecast month fell outside the supported calendar.
    #[error("Date out of range after {0}")]
    DateOverflow(NaiveDate),
}

/// A memoized region forecast and the model that produced it.
#[derive(Debug)]
struct CachedForecast {
    points: Arc<[ForecastPoint]>,
    model: Arc<FittedModel>,
}

type CacheSlot = Arc<Mutex<Option<CachedForecast>>>;

/// Fits forecasts and memoizes region-level results.
///
/// Region forecasts are cached by [`ForecastKey`]; concurrent requests for
/// the same key wait for a single fit while other keys proceed. Crime type
/// forecasts are recomputed on every call.
#[derive(Debug)]
pub struct Forecaster {
    config: ForecastConfig,
    cache: Mutex<BTreeMap<ForecastKey, CacheSlot>>,
    fits: AtomicUsize,
}

impl Forecaster {
    /// Creates a forecaster with an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Config`] if `config` is invalid.
    pub fn new(config: ForecastConfig) -> Result<Self, ForecastError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: Mutex::new(BTreeMap::new()),
            fits: AtomicUsize::new(0),
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Number of models fitted since creation.
    #[must_use]
    pub fn fit_count(&self) -> usize {
        self.fits.load(Ordering::SeqCst)
    }

    /// Number of cached region forecasts.
    #[must_use]
    pub fn cached_forecasts(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    /// The model retained for a cached region forecast, if any.
    #[must_use]
    pub fn cached_model(
        &self,
        region: &RegionFilter,
        horizon: ForecastHorizon,
    ) -> Option<Arc<FittedModel>> {
        let key = ForecastKey::region(region.label(), horizon);
        let slot = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map(Arc::clone)?;
        let cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        cached.as_ref().map(|entry| Arc::clone(&entry.model))
    }

    /// Forecasts an arbitrary series without caching.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError`] if the model cannot be fitted.
    pub fn forecast(
        &self,
        series: &[Observation],
        horizon: ForecastHorizon,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        self.fit(series, horizon).map(|(points, _)| points)
    }

    fn fit(
        &self,
        series: &[Observation],
        horizon: ForecastHorizon,
    ) -> Result<(Vec<ForecastPoint>, Option<FittedModel>), ForecastError> {
        if series.is_empty() {
            return Ok((vec![], None));
        }
        self.fits.fetch_add(1, Ordering::SeqCst);
        model::forecast_with_model(series, horizon, &self.config)
    }

    /// Forecasts the total incidents of a region, memoized per region and
    /// horizon.
    ///
    /// A region without data yields an empty forecast that is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError`] if the model cannot be fitted.
    pub fn forecast_by_region(
        &self,
        dataset: &CrimeDataset,
        region: &RegionFilter,
        horizon: ForecastHorizon,
    ) -> Result<Arc<[ForecastPoint]>, ForecastError> {
        let has_data = match region {
            RegionFilter::All => !dataset.records.is_empty(),
            RegionFilter::Region(name) => dataset.has_region(name),
        };
        if !has_data {
            log::warn!("No data available for {region}");
            return Ok(Arc::from([]));
        }

        let key = ForecastKey::region(region.label(), horizon);
        let slot = Arc::clone(
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_default(),
        );

        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = cached.as_ref() {
            log::debug!("Using cached forecast for {region} ({horizon} months)");
            return Ok(Arc::clone(&entry.points));
        }

        let series: Vec<Observation> = region_series(dataset, region)
            .into_iter()
            .map(Observation::from)
            .collect();
        log::info!("Forecasting {region}: {} historical points", series.len());

        let (points, model) = self.fit(&series, horizon)?;
        let points: Arc<[ForecastPoint]> = points.into();
        if let Some(model) = model {
            *cached = Some(CachedForecast {
                points: Arc::clone(&points),
                model: Arc::new(model),
            });
        }
        Ok(points)
    }

    /// Forecasts one crime type within a region. Never cached.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError`] if the model cannot be fitted.
    pub fn forecast_by_crime_type(
        &self,
        dataset: &CrimeDataset,
        crime_type: CrimeType,
        region: &RegionFilter,
        horizon: ForecastHorizon,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let series: Vec<Observation> = crime_type_series(dataset, region, crime_type)
            .into_iter()
            .map(Observation::from)
            .collect();
        if series.is_empty() {
            log::warn!("No {crime_type} data available for {region}");
            return Ok(vec![]);
        }
        log::info!(
            "Forecasting {crime_type} for {region}: {} historical points",
            series.len()
        );
        self.forecast(&series, horizon)
    }

    /// Summarizes the future part of a forecast.
    #[must_use]
    pub fn summary(points: &[ForecastPoint]) -> Option<ForecastSummary> {
        ForecastSummary::from_points(points)
    }

    /// Drops every cached forecast and its retained model.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let cleared = cache.len();
        cache.clear();
        drop(cache);
        log::info!("Forecast cache cleared ({cleared} entries)");
    }
}
