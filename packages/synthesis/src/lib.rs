#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Synthesizes the canonical monthly crime dataset from sparse annual data.
//!
//! The stages run in order:
//!
//! 1. [`extrapolate`] extends each region's real annual window with fixed
//!    decay backward and fixed growth forward.
//! 2. [`disaggregate`] splits each annual total into monthly values that
//!    follow the seasonality weights, carry reproducible jitter and sum
//!    back to the annual total exactly.
//! 3. [`allocate`] stamps the global category mix onto every month.
//! 4. [`validate`] reconciles the result against the annual totals.
//!
//! All arithmetic on counts truncates. The exact-sum guarantee depends on
//! the truncate-then-reconcile order, so none of the stages round.

pub mod allocate;
pub mod config;
pub mod disaggregate;
pub mod extrapolate;
pub mod validate;

use crime_forecast_dataset_models::{AnnualTable, CategoryCountTable, CrimeDataset};

pub use config::{JitterSeed, SynthesisConfig};

/// Errors that can occur while synthesizing the dataset.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The synthesis parameters are inconsistent.
    #[error("Invalid synthesis config: {0}")]
    Config(String),

    /// The category counts table holds no positive counts, so no
    /// proportions can be derived.
    #[error("Category counts table has no positive counts")]
    EmptyCategoryCounts,
}

/// Runs every synthesis stage and returns the canonical dataset.
///
/// # Errors
///
/// Returns [`SynthesisError`] if `config` is invalid or the category
/// counts are empty.
pub fn synthesize(
    annual: &AnnualTable,
    categories: &CategoryCountTable,
    config: &SynthesisConfig,
) -> Result<CrimeDataset, SynthesisError> {
    config.validate()?;

    let extended = extrapolate::extrapolate_table(annual, config);
    let final_year = annual.last_year + i32::try_from(config.forward_years).unwrap_or(0);
    log::info!(
        "Extended {} regions to {}-{}",
        extended.len(),
        annual.first_year - i32::try_from(config.backward_years).unwrap_or(0),
        final_year
    );

    // Only an extrapolated final year is cut short; real years stay whole.
    let partial_year = config
        .partial_year_months
        .filter(|_| final_year > annual.last_year);

    let mut records = Vec::new();
    for region in &extended {
        for (year, total) in &region.totals {
            let months = match partial_year {
                Some(months) if *year == final_year => months,
                _ => 12,
            };
            records.extend(disaggregate::disaggregate(
                &region.region,
                *year,
                *total,
                months,
                config,
            ));
        }
    }
    log::info!("Generated {} monthly records", records.len());

    let proportions = allocate::category_proportions(categories)?;
    allocate::allocate(&mut records, &proportions);
    log::info!(
        "Allocated {} crime type categories",
        proportions.0.len()
    );

    let validation = validate::validate(&extended, &records, config.validation_tolerance);

    Ok(CrimeDataset {
        annual: extended,
        records,
        proportions,
        validation,
    })
}
