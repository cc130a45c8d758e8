//! Build-time reconciliation of monthly records against annual totals.

use std::collections::BTreeMap;

use crime_forecast_crime_models::CrimeType;
use crime_forecast_dataset_models::{
    AnnualRecord, MonthlyRecord, ValidationMismatch, ValidationReport,
};

/// Checks every full region-year and every record's category breakdown.
///
/// A region-year counts as full when it has twelve records. Partial years
/// are skipped since their months only cover part of the annual total.
/// Mismatches beyond `tolerance` are logged and collected, never fatal.
#[must_use]
pub fn validate(
    annual: &[AnnualRecord],
    records: &[MonthlyRecord],
    tolerance: u64,
) -> ValidationReport {
    let mut sums: BTreeMap<(&str, i32), (u64, usize)> = BTreeMap::new();
    for record in records {
        let entry = sums
            .entry((record.region.as_str(), record.year))
            .or_default();
        entry.0 += record.total;
        entry.1 += 1;
    }

    let mut report = ValidationReport::default();

    for region in annual {
        for (year, expected) in &region.totals {
            let Some((actual, months)) = sums.get(&(region.region.as_str(), *year)) else {
                continue;
            };
            if *months != 12 {
                continue;
            }
            report.years_checked += 1;
            if expected.abs_diff(*actual) > tolerance {
                log::warn!(
                    "Mismatch for {} {year}: annual {expected} vs monthly {actual}",
                    region.region
                );
                report.mismatches.push(ValidationMismatch {
                    region: region.region.clone(),
                    year: *year,
                    expected: *expected,
                    actual: *actual,
                });
            }
        }
    }

    let max_drift = CrimeType::count() as u64;
    report.category_drift = records
        .iter()
        .filter(|r| r.category_sum().abs_diff(r.total) > max_drift)
        .count();
    if report.category_drift > 0 {
        log::warn!(
            "{} monthly records drift more than {max_drift} from their category breakdown",
            report.category_drift
        );
    }

    log::info!(
        "Validated {} region-years ({} mismatches)",
        report.years_checked,
        report.mismatches.len()
    );

    report
}
