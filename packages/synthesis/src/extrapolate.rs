//! Yearly extrapolation.
//!
//! Extends a region's real annual window backward with a fixed decay and
//! forward with a fixed growth. Every step truncates, so extrapolated
//! values sit slightly below exact exponential scaling.

use crime_forecast_dataset_models::{AnnualRecord, AnnualTable};

use crate::config::SynthesisConfig;

/// Extends every record of `table` to
/// `[first_year - backward_years, last_year + forward_years]`.
#[must_use]
pub fn extrapolate_table(table: &AnnualTable, config: &SynthesisConfig) -> Vec<AnnualRecord> {
    table
        .records
        .iter()
        .map(|record| extrapolate(record, config))
        .collect()
}

/// Extends a single record. Records with no years are returned unchanged.
#[must_use]
pub fn extrapolate(record: &AnnualRecord, config: &SynthesisConfig) -> AnnualRecord {
    let mut extended = record.clone();
    let (Some(first), Some(last)) = (record.first_year(), record.last_year()) else {
        return extended;
    };

    let mut value = record.totals[&first];
    for offset in 1..=config.backward_years {
        value = scale(value, config.backcast_percent);
        extended.totals.insert(first - offset_i32(offset), value);
    }

    let mut value = record.totals[&last];
    for offset in 1..=config.forward_years {
        value = scale(value, config.growth_percent);
        extended.totals.insert(last + offset_i32(offset), value);
    }

    extended
}

/// `floor(value * percent / 100)` without going through floating point.
const fn scale(value: u64, percent: u64) -> u64 {
    value.saturating_mul(percent) / 100
}

fn offset_i32(offset: u32) -> i32 {
    i32::try_from(offset).unwrap_or(i32::MAX)
}
