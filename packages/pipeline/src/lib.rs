#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point tying loading, synthesis, queries and forecasts together.
//!
//! A [`PipelineContext`] owns one dataset source and builds the canonical
//! dataset on first use. Once built the dataset is shared read-only; if the
//! build fails, the failure is recorded and every later request is rejected
//! with the same reason.

pub mod config;
pub mod source;

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crime_forecast_analytics::{
    CategoryCount, IncidentQuery, IncidentRecord, IncidentStats, RegionFilter, RegionalSummary,
    TrendPoint,
};
use crime_forecast_crime_models::{ALL_TYPES, CrimeType};
use crime_forecast_dataset::DatasetError;
use crime_forecast_dataset_models::{CrimeDataset, ValidationReport};
use crime_forecast_forecast::{ForecastConfig, ForecastError, Forecaster};
use crime_forecast_forecast_models::{
    ForecastHorizon, ForecastPoint, ForecastSummary, InvalidPeriodsError,
};
use crime_forecast_synthesis::{SynthesisConfig, SynthesisError, synthesize};
use serde::{Deserialize, Serialize};

pub use config::{ConfigError, DATASET_DIR_ENV, PipelineConfig};
pub use source::{CsvDirectorySource, DatasetSource, InMemorySource};

/// Errors returned by pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The source tables could not be loaded.
    #[error("Dataset load failed: {0}")]
    Dataset(#[from] DatasetError),

    /// The dataset could not be synthesized.
    #[error("Dataset synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// A forecast could not be produced.
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// The requested forecast horizon is out of range.
    #[error(transparent)]
    InvalidPeriods(#[from] InvalidPeriodsError),

    /// An earlier build failed; the dataset is unavailable.
    #[error("Data initialization failed: {0}")]
    Failed(String),
}

/// Lifecycle of the canonical dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing has requested the dataset yet.
    Uninitialized,
    /// A build is in progress.
    Initializing,
    /// The dataset is available.
    Ready,
    /// The build failed with the recorded reason.
    Failed(String),
}

/// Incident statistics combined with the region's forecast outlook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    /// Statistics over the requested scope.
    #[serde(flatten)]
    pub stats: IncidentStats,
    /// Summary of the default-horizon region forecast, when there is one.
    pub forecast: Option<ForecastSummary>,
}

/// Crime type selection parsed from a request label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrimeTypeFilter {
    All,
    Only(CrimeType),
    Unknown,
}

impl CrimeTypeFilter {
    fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label == ALL_TYPES {
            return Self::All;
        }
        CrimeType::from_filter(label).map_or_else(
            || {
                log::warn!("Unknown crime type '{label}'");
                Self::Unknown
            },
            Self::Only,
        )
    }
}

/// Owns the dataset lifecycle and the forecaster.
pub struct PipelineContext {
    source: Box<dyn DatasetSource>,
    synthesis: SynthesisConfig,
    forecaster: Forecaster,
    state: Mutex<PipelineState>,
    dataset: OnceLock<Arc<CrimeDataset>>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("source", &self.source.describe())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Creates a context reading the CSV tables named in `config`.
    ///
    /// Nothing is loaded until the first request.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Forecast`] if the forecast parameters are
    /// invalid.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_source(
            CsvDirectorySource::new(config.dataset),
            config.synthesis,
            config.forecast,
        )
    }

    /// Creates a context over an arbitrary dataset source.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Forecast`] if the forecast parameters are
    /// invalid.
    pub fn with_source(
        source: impl DatasetSource + 'static,
        synthesis: SynthesisConfig,
        forecast: ForecastConfig,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            source: Box::new(source),
            synthesis,
            forecaster: Forecaster::new(forecast)?,
            state: Mutex::new(PipelineState::Uninitialized),
            dataset: OnceLock::new(),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The forecaster, for cache inspection.
    #[must_use]
    pub const fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    fn load_dataset(&self) -> Result<CrimeDataset, PipelineError> {
        log::info!("Building dataset from {}", self.source.describe());
        let tables = self.source.load()?;
        let dataset = synthesize(&tables.annual, &tables.categories, &self.synthesis)?;
        if !dataset.validation.is_clean() {
            log::warn!(
                "Dataset built with {} annual mismatches and {} drifting records",
                dataset.validation.mismatches.len(),
                dataset.validation.category_drift
            );
        }
        log::info!(
            "Dataset ready: {} regions, {} monthly records",
            dataset.annual.len(),
            dataset.records.len()
        );
        Ok(dataset)
    }

    /// Builds the dataset if needed and returns it.
    ///
    /// Concurrent first callers wait for a single build. A failed build is
    /// sticky: it is not retried and its reason is returned to every caller.
    ///
    /// # Errors
    ///
    /// Returns the build error on the failing call and
    /// [`PipelineError::Failed`] on every call after it.
    pub fn build(&self) -> Result<Arc<CrimeDataset>, PipelineError> {
        if let Some(dataset) = self.dataset.get() {
            return Ok(Arc::clone(dataset));
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            PipelineState::Failed(reason) => return Err(PipelineError::Failed(reason.clone())),
            PipelineState::Ready => {
                if let Some(dataset) = self.dataset.get() {
                    return Ok(Arc::clone(dataset));
                }
            }
            PipelineState::Uninitialized | PipelineState::Initializing => {}
        }

        *state = PipelineState::Initializing;
        match self.load_dataset() {
            Ok(dataset) => {
                let dataset = Arc::clone(self.dataset.get_or_init(|| Arc::new(dataset)));
                *state = PipelineState::Ready;
                Ok(dataset)
            }
            Err(e) => {
                log::error!("Dataset build failed: {e}");
                *state = PipelineState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Alias for [`PipelineContext::build`] for read paths.
    ///
    /// # Errors
    ///
    /// See [`PipelineContext::build`].
    pub fn ready(&self) -> Result<Arc<CrimeDataset>, PipelineError> {
        self.build()
    }

    /// Build-time validation results.
    ///
    /// # Errors
    ///
    /// See [`PipelineContext::build`].
    pub fn validation(&self) -> Result<ValidationReport, PipelineError> {
        Ok(self.ready()?.validation.clone())
    }

    /// Region labels, [`crime_forecast_dataset_models::ALL_REGIONS`] first.
    ///
    /// # Errors
    ///
    /// See [`PipelineContext::build`].
    pub fn regions(&self) -> Result<Vec<String>, PipelineError> {
        let dataset = self.ready()?;
        Ok(crime_forecast_analytics::list_regions(&dataset))
    }

    /// Category labels, [`ALL_TYPES`] first. Needs no dataset.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        crime_forecast_analytics::list_categories()
    }

    fn scope(region: &str, year: &str, crime_type: &str) -> Option<IncidentQuery> {
        let crime_type = match CrimeTypeFilter::parse(crime_type) {
            CrimeTypeFilter::All => None,
            CrimeTypeFilter::Only(t) => Some(t),
            CrimeTypeFilter::Unknown => return None,
        };
        Some(
            IncidentQuery::new(
                RegionFilter::parse(region),
                crime_forecast_analytics::parse_year_filter(year),
            )
            .with_crime_type(crime_type),
        )
    }

    /// Monthly incident records for a region and year (`"all"` or a year).
    ///
    /// # Errors
    ///
    /// See [`PipelineContext::build`].
    pub fn incidents(&self, region: &str, year: &str) -> Result<Vec<IncidentRecord>, PipelineError> {
        let dataset = self.ready()?;
        Ok(crime_forecast_analytics::query(
            &dataset,
            &RegionFilter::parse(region),
            crime_forecast_analytics::parse_year_filter(year),
        ))
    }

    /// Monthly incident trend. An unknown crime type yields no points.
    ///
    /// # Errors
    ///
    /// See [`PipelineContext::build`].
    pub fn trend(
        &self,
        region: &str,
        year: &str,
        crime_type: &str,
    ) -> Result<Vec<TrendPoint>, PipelineError> {
        let dataset = self.ready()?;
        Ok(Self::scope(region, year, crime_type)
            .map(|q| crime_forecast_analytics::trend(&dataset, &q))
            .unwrap_or_default())
    }

    /// Per-crime-type totals. An unknown crime type yields no entries.
    ///
    /// # Errors
    ///
    /// See [`PipelineContext::build`].
    pub fn crime_type_distribution(
        &self,
        region: &str,
        year: &str,
        crime_type: &str,
    ) -> Result<Vec<CategoryCount>, PipelineError> {
        let dataset = self.ready()?;
        Ok(Self::scope(region, year, crime_type)
            .map(|q| crime_forecast_analytics::crime_type_distribution(&dataset, &q))
            .unwrap_or_default())
    }

    /// Per-region totals with risk tiers. An unknown crime type yields no
    /// entries.
    ///
    /// # Errors
    ///
    /// See [`PipelineContext::build`].
    pub fn regional_distribution(
        &self,
        region: &str,
        year: &str,
        crime_type: &str,
    ) -> Result<Vec<RegionalSummary>, PipelineError> {
        let dataset = self.ready()?;
        Ok(Self::scope(region, year, crime_type)
            .map(|q| crime_forecast_analytics::regional_distribution(&dataset, &q))
            .unwrap_or_default())
    }

    /// Statistics for the scope together with the summary of the region's
    /// default-horizon forecast. The forecast ignores the year and crime
    /// type filters. Returns `None` for an unknown crime type.
    ///
    /// # Errors
    ///
    /// See [`PipelineContext::build`]; also fails if the forecast cannot be
    /// fitted.
    pub fn stats(
        &self,
        region: &str,
        year: &str,
        crime_type: &str,
    ) -> Result<Option<StatsReport>, PipelineError> {
        let dataset = self.ready()?;
        let Some(query) = Self::scope(region, year, crime_type) else {
            return Ok(None);
        };
        let stats = crime_forecast_analytics::incident_stats(&dataset, &query);
        let points =
            self.forecaster
                .forecast_by_region(&dataset, &query.region, ForecastHorizon::DEFAULT)?;
        Ok(Some(StatsReport {
            stats,
            forecast: Forecaster::summary(&points),
        }))
    }

    /// Forecasts a region's incidents, or one crime type's when
    /// `crime_type` names one.
    ///
    /// `periods` is checked before any data is touched. Region forecasts
    /// are memoized; crime type forecasts are not. Unknown regions and
    /// crime types yield an empty forecast.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidPeriods`] if `periods` is outside
    /// 1-24, the build error if the dataset is unavailable, or
    /// [`PipelineError::Forecast`] if the model cannot be fitted.
    pub fn forecast(
        &self,
        region: &str,
        periods: u32,
        crime_type: Option<&str>,
    ) -> Result<Vec<ForecastPoint>, PipelineError> {
        let horizon = ForecastHorizon::try_from(periods)?;
        let dataset = self.ready()?;
        let region = RegionFilter::parse(region);

        match crime_type.map_or(CrimeTypeFilter::All, CrimeTypeFilter::parse) {
            CrimeTypeFilter::All => Ok(self
                .forecaster
                .forecast_by_region(&dataset, &region, horizon)?
                .to_vec()),
            CrimeTypeFilter::Only(crime_type) => Ok(self
                .forecaster
                .forecast_by_crime_type(&dataset, crime_type, &region, horizon)?),
            CrimeTypeFilter::Unknown => Ok(vec![]),
        }
    }

    /// Summary of the future part of `points`.
    #[must_use]
    pub fn forecast_summary(points: &[ForecastPoint]) -> Option<ForecastSummary> {
        Forecaster::summary(points)
    }

    /// Drops every memoized forecast. The dataset itself is kept.
    pub fn clear_cache(&self) {
        self.forecaster.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crime_forecast_dataset::SourceTables;
    use crime_forecast_dataset_models::{
        AnnualRecord, AnnualTable, CategoryCountRow, CategoryCountTable,
    };

    use super::*;

    fn tables() -> SourceTables {
        let regions: [(&str, [u64; 5]); 3] = [
            ("Karnataka", [5839, 12020, 10741, 8136, 12556]),
            ("Kerala", [340, 307, 426, 626, 773]),
            ("Goa", [58, 15, 40, 36, 15]),
        ];
        SourceTables {
            annual: AnnualTable {
                records: regions
                    .iter()
                    .map(|(name, values)| {
                        let mut record = AnnualRecord::new(*name);
                        record.totals.extend((2018..).zip(values.iter().copied()));
                        record
                    })
                    .collect(),
                first_year: 2018,
                last_year: 2022,
            },
            categories: CategoryCountTable {
                labels: vec!["Fraud".to_string(), "Anger".to_string()],
                rows: vec![CategoryCountRow {
                    label: "Bengaluru".to_string(),
                    counts: BTreeMap::from([
                        ("Fraud".to_string(), 70),
                        ("Anger".to_string(), 30),
                    ]),
                }],
            },
        }
    }

    /// Counts loads and optionally fails them.
    struct ProbeSource {
        loads: Arc<AtomicUsize>,
        fail: bool,
    }

    impl DatasetSource for ProbeSource {
        fn describe(&self) -> String {
            "probe".to_string()
        }

        fn load(&self) -> Result<SourceTables, DatasetError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DatasetError::MissingColumn("State/UT".to_string()))
            } else {
                Ok(tables())
            }
        }
    }

    fn context() -> PipelineContext {
        PipelineContext::with_source(
            InMemorySource::new(tables()),
            SynthesisConfig::default(),
            ForecastConfig::default(),
        )
        .unwrap()
    }

    fn probe(fail: bool) -> (PipelineContext, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let context = PipelineContext::with_source(
            ProbeSource {
                loads: Arc::clone(&loads),
                fail,
            },
            SynthesisConfig::default(),
            ForecastConfig::default(),
        )
        .unwrap();
        (context, loads)
    }

    #[test]
    fn dataset_is_built_lazily_once() {
        let (context, loads) = probe(false);
        assert_eq!(context.state(), PipelineState::Uninitialized);
        assert_eq!(context.categories()[0], "All Types");
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        let regions = context.regions().unwrap();
        assert_eq!(regions, vec!["All Regions", "Goa", "Karnataka", "Kerala"]);
        assert_eq!(context.state(), PipelineState::Ready);

        context.incidents("Goa", "all").unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_requests_build_once() {
        let (context, loads) = probe(false);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let dataset = context.build().unwrap();
                    assert_eq!(dataset.annual.len(), 3);
                });
            }
        });
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_build_is_sticky() {
        let (context, loads) = probe(true);
        let first = context.regions().unwrap_err();
        assert!(matches!(first, PipelineError::Dataset(_)));
        assert!(matches!(context.state(), PipelineState::Failed(_)));

        let second = context.incidents("Goa", "all").unwrap_err();
        match second {
            PipelineError::Failed(reason) => assert!(reason.contains("State/UT"), "{reason}"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(context.forecast("Goa", 6, None).is_err());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_synthesis_config_fails_the_build() {
        let context = PipelineContext::with_source(
            InMemorySource::new(tables()),
            SynthesisConfig {
                jitter_min: 1.2,
                jitter_max: 1.1,
                ..SynthesisConfig::default()
            },
            ForecastConfig::default(),
        )
        .unwrap();
        assert!(matches!(context.build(), Err(PipelineError::Synthesis(_))));
        assert!(matches!(context.build(), Err(PipelineError::Failed(_))));
    }

    #[test]
    fn periods_are_checked_before_building() {
        let (context, loads) = probe(false);
        for periods in [0, 25] {
            assert!(matches!(
                context.forecast("All Regions", periods, None),
                Err(PipelineError::InvalidPeriods(_))
            ));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(context.state(), PipelineState::Uninitialized);
    }

    #[test]
    fn region_forecasts_are_memoized_until_cleared() {
        let context = context();
        let first = context.forecast("Kerala", 6, None).unwrap();
        let second = context.forecast("Kerala", 6, Some("All Types")).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 9);
        assert_eq!(first[3].date, "2025-07");
        assert_eq!(context.forecaster().fit_count(), 1);

        context.clear_cache();
        context.forecast("Kerala", 6, None).unwrap();
        assert_eq!(context.forecaster().fit_count(), 2);
    }

    #[test]
    fn crime_type_forecasts_and_unknown_labels() {
        let context = context();
        let points = context.forecast("Karnataka", 3, Some("UPI Fraud")).unwrap();
        assert_eq!(points.len(), 6);
        assert!(points[3..].iter().all(|p| p.predicted >= 0));

        assert!(context.forecast("Karnataka", 3, Some("Jaywalking")).unwrap().is_empty());
        assert!(context.forecast("Atlantis", 3, None).unwrap().is_empty());
        assert!(context.trend("Karnataka", "all", "Jaywalking").unwrap().is_empty());
        assert!(context.stats("Karnataka", "all", "Jaywalking").unwrap().is_none());
    }

    #[test]
    fn incidents_cover_synthesized_window() {
        let context = context();
        let all = context.incidents("All Regions", "all").unwrap();
        // 2016-2024 in full plus six months of 2025.
        assert_eq!(all.len(), 9 * 12 + 6);

        let goa_2018: u64 = context
            .incidents("Goa", "2018")
            .unwrap()
            .iter()
            .map(|r| r.incidents)
            .sum();
        assert_eq!(goa_2018, 58);

        // An unparseable year means every year.
        assert_eq!(context.incidents("Goa", "recent").unwrap().len(), all.len());
    }

    #[test]
    fn stats_combine_scope_and_forecast() {
        let context = context();
        let report = context.stats("All Regions", "2022", "All Types").unwrap().unwrap();
        assert_eq!(report.stats.total_incidents, 12556 + 773 + 15);
        assert_eq!(report.stats.top_region, "Karnataka");
        assert_eq!(report.stats.most_common_type, CrimeType::UpiFraud);
        assert!(report.forecast.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalIncidents"], 12556 + 773 + 15);
        assert!(json["forecast"]["next_month"].is_i64());
    }

    #[test]
    fn distributions_through_the_context() {
        let context = context();
        let regional = context
            .regional_distribution("All Regions", "2022", "All Types")
            .unwrap();
        assert_eq!(regional.len(), 3);
        let karnataka = regional.iter().find(|r| r.region == "Karnataka").unwrap();
        assert_eq!(karnataka.incidents, 12556);

        let types = context
            .crime_type_distribution("Kerala", "all", "Phishing")
            .unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].crime_type, CrimeType::Phishing);

        let trend = context.trend("Kerala", "2019", "All Types").unwrap();
        assert_eq!(trend.len(), 12);
        assert_eq!(trend.iter().map(|p| p.incidents).sum::<u64>(), 307);
    }

    #[test]
    fn loads_csv_directory_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("annual.csv"),
            "Sl. No.,Categroy,State/UT,2018,2019,2020,2021,2022\n\
             1,State,Kerala,340,307,426,626,773\n\
             2,State,Goa,58,15,40,36,15\n\
             3,Total (States),Total (States),398,322,466,662,788\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("categories.csv"),
            "City,Fraud,Anger,Total\nKochi,60,40,100\n",
        )
        .unwrap();

        let mut config = PipelineConfig::default();
        config.dataset.dir = dir.path().to_path_buf();
        config.dataset.annual_file = "annual.csv".to_string();
        config.dataset.category_file = "categories.csv".to_string();

        let context = PipelineContext::new(config).unwrap();
        assert_eq!(context.regions().unwrap(), vec!["All Regions", "Goa", "Kerala"]);
        assert!(context.validation().unwrap().is_clean());
    }
}
