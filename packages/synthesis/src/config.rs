//! Synthesis parameters.

use serde::Deserialize;

use crate::SynthesisError;

/// Per-month weights for January through December. They sum to 12 so the
/// mean weight is 1. Q2 and Q4 run hotter than the start of the year.
pub const DEFAULT_SEASONALITY: [f64; 12] = [
    0.85, 0.82, 0.95, 1.08, 1.12, 1.05, 0.98, 0.92, 1.03, 1.10, 1.05, 1.05,
];

/// How the jitter generator for a region-year is seeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterSeed {
    /// Stable hash of `(region, year)`. Unrelated series that share an
    /// annual total get independent monthly shapes.
    #[default]
    RegionYear,
    /// The annual total itself. Identical totals always produce identical
    /// jitter, whichever region-year they belong to.
    AnnualTotal,
}

/// Parameters for every synthesis stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SynthesisConfig {
    /// Years synthesized before the first real year.
    pub backward_years: u32,
    /// Years synthesized after the last real year.
    pub forward_years: u32,
    /// Each earlier year is this percentage of the following one.
    pub backcast_percent: u64,
    /// Each later year is this percentage of the preceding one.
    pub growth_percent: u64,
    /// Months emitted for the final synthetic year. `None` emits all twelve.
    pub partial_year_months: Option<u32>,
    /// Monthly seasonality weights.
    pub seasonality: Vec<f64>,
    /// Lower bound of the multiplicative jitter.
    pub jitter_min: f64,
    /// Upper bound of the multiplicative jitter (exclusive).
    pub jitter_max: f64,
    /// Jitter seeding mode.
    pub jitter_seed: JitterSeed,
    /// Largest monthly-vs-annual difference the validator tolerates.
    pub validation_tolerance: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            backward_years: 2,
            forward_years: 3,
            backcast_percent: 90,
            growth_percent: 110,
            partial_year_months: Some(6),
            seasonality: DEFAULT_SEASONALITY.to_vec(),
            jitter_min: 0.90,
            jitter_max: 1.10,
            jitter_seed: JitterSeed::default(),
            validation_tolerance: 1,
        }
    }
}

impl SynthesisConfig {
    /// Checks the parameters for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Config`] if the seasonality vector does
    /// not have twelve positive weights summing to 12, the jitter
    /// bounds are inverted or non-positive, or the partial-year month
    /// count is outside 1-12.
    pub fn validate(&self) -> Result<(), SynthesisError> {
        if self.seasonality.len() != 12 {
            return Err(SynthesisError::Config(format!(
                "seasonality needs 12 weights, got {}",
                self.seasonality.len()
            )));
        }
        if self.seasonality.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(SynthesisError::Config(
                "seasonality weights must be finite and positive".to_string(),
            ));
        }
        let sum: f64 = self.seasonality.iter().sum();
        if (sum - 12.0).abs() > 1e-6 {
            return Err(SynthesisError::Config(format!(
                "seasonality weights must sum to 12, got {sum}"
            )));
        }
        if !(self.jitter_min > 0.0 && self.jitter_min <= self.jitter_max) {
            return Err(SynthesisError::Config(format!(
                "invalid jitter bounds [{}, {})",
                self.jitter_min, self.jitter_max
            )));
        }
        if let Some(months) = self.partial_year_months
            && !(1..=12).contains(&months)
        {
            return Err(SynthesisError::Config(format!(
                "partial_year_months must be 1-12, got {months}"
            )));
        }
        Ok(())
    }

    /// Seasonality as a fixed array. Call after [`Self::validate`].
    #[must_use]
    pub fn seasonality_weights(&self) -> [f64; 12] {
        let mut weights = DEFAULT_SEASONALITY;
        for (slot, w) in weights.iter_mut().zip(&self.seasonality) {
            *slot = *w;
        }
        weights
    }
}
