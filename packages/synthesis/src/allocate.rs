//! Category allocation.
//!
//! Computes one global category mix from the raw category counts and
//! stamps it onto every monthly total. The mix carries no regional or
//! seasonal signal: every record gets the same proportions.

use std::collections::BTreeMap;

use crime_forecast_crime_models::CrimeType;
use crime_forecast_dataset::type_mapping::map_raw_label;
use crime_forecast_dataset_models::{CategoryCountTable, CategoryProportions, MonthlyRecord};

use crate::SynthesisError;

/// Computes the global share of each canonical crime type.
///
/// Raw label totals are summed across rows, folded into their canonical
/// bucket and normalized by the grand total. Every canonical type is
/// present in the result, with 0.0 when no raw label maps to it.
///
/// # Errors
///
/// Returns [`SynthesisError::EmptyCategoryCounts`] if the table holds no
/// positive counts.
#[allow(clippy::cast_precision_loss)]
pub fn category_proportions(
    table: &CategoryCountTable,
) -> Result<CategoryProportions, SynthesisError> {
    let mut buckets: BTreeMap<CrimeType, u64> =
        CrimeType::all().iter().map(|t| (*t, 0)).collect();

    for (label, total) in table.label_totals() {
        if total == 0 {
            continue;
        }
        *buckets.entry(map_raw_label(label)).or_default() += total;
    }

    let grand_total: u64 = buckets.values().sum();
    if grand_total == 0 {
        return Err(SynthesisError::EmptyCategoryCounts);
    }

    Ok(CategoryProportions(
        buckets
            .into_iter()
            .map(|(crime_type, count)| (crime_type, count as f64 / grand_total as f64))
            .collect(),
    ))
}

/// Fills in the per-category counts of every record, truncating each share.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn allocate(records: &mut [MonthlyRecord], proportions: &CategoryProportions) {
    for record in records {
        record.categories = proportions
            .iter()
            .map(|(crime_type, share)| (crime_type, (record.total as f64 * share) as u64))
            .collect();
    }
}
