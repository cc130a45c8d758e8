//! Yearly → monthly disaggregation.
//!
//! An annual total is spread over twelve months by the seasonality
//! weights, each month is jittered by a reproducible random factor and
//! truncated, and the truncation error is handed back to the months so
//! the twelve values sum to the annual total exactly.

use std::collections::BTreeMap;

use crime_forecast_dataset_models::MonthlyRecord;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

use crate::config::{JitterSeed, SynthesisConfig};

/// Derives the jitter seed for a region-year.
#[must_use]
pub fn jitter_seed(mode: JitterSeed, region: &str, year: i32, annual_total: u64) -> u64 {
    match mode {
        JitterSeed::AnnualTotal => annual_total,
        JitterSeed::RegionYear => {
            let mut context = md5::Context::new();
            context.consume(region.as_bytes());
            context.consume([0u8]);
            context.consume(year.to_le_bytes());
            let digest = context.finalize();
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest.0[..8]);
            u64::from_le_bytes(bytes)
        }
    }
}

/// Splits `annual_total` into twelve monthly values that sum to it exactly.
///
/// `jitter` is the `[min, max)` range of the multiplicative noise; a
/// degenerate range (`min == max`) applies a constant factor.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn distribute(annual_total: u64, weights: &[f64; 12], jitter: (f64, f64), seed: u64) -> [u64; 12] {
    let mut rng = StdRng::seed_from_u64(seed);
    let (jitter_min, jitter_max) = jitter;

    let mut monthly = [0i128; 12];
    for (slot, weight) in monthly.iter_mut().zip(weights) {
        let base = annual_total as f64 * (weight / 12.0);
        let factor = if jitter_min < jitter_max {
            rng.gen_range(jitter_min..jitter_max)
        } else {
            jitter_min
        };
        *slot = (base * factor) as i128;
    }

    reconcile(&mut monthly, i128::from(annual_total));

    // Every month is in [0, annual_total] once reconciled.
    monthly.map(|m| u64::try_from(m).unwrap_or(u64::MAX))
}

/// Spreads `target - sum(monthly)` across the months: an equal share to
/// every month, then one unit each to the leading months for the remainder.
///
/// A reduction a month cannot absorb without going negative is taken from
/// the other months in order.
fn reconcile(monthly: &mut [i128; 12], target: i128) {
    let diff = target - monthly.iter().sum::<i128>();
    if diff == 0 {
        return;
    }

    let sign = diff.signum();
    let magnitude = diff.abs();
    let per_month = magnitude / 12;
    let remainder = magnitude % 12;

    let mut shortfall = 0;
    for (index, month) in monthly.iter_mut().enumerate() {
        let share = per_month + i128::from(i128::try_from(index).is_ok_and(|i| i < remainder));
        if sign > 0 {
            *month += share;
        } else {
            let taken = share.min(*month);
            *month -= taken;
            shortfall += share - taken;
        }
    }

    for month in monthly.iter_mut() {
        if shortfall == 0 {
            break;
        }
        let taken = shortfall.min(*month);
        *month -= taken;
        shortfall -= taken;
    }
}

/// Produces the monthly record shells (totals only) for one region-year.
///
/// `months` limits output to the first N months of the year for a partial
/// year. The full twelve-month distribution is still computed, so partial
/// months keep the values they would have in a complete year.
#[must_use]
pub fn disaggregate(
    region: &str,
    year: i32,
    annual_total: u64,
    months: u32,
    config: &SynthesisConfig,
) -> Vec<MonthlyRecord> {
    let seed = jitter_seed(config.jitter_seed, region, year, annual_total);
    let values = distribute(
        annual_total,
        &config.seasonality_weights(),
        (config.jitter_min, config.jitter_max),
        seed,
    );

    (1..=months.min(12))
        .zip(values)
        .map(|(month, total)| MonthlyRecord {
            region: region.to_string(),
            year,
            month,
            total,
            categories: BTreeMap::new(),
        })
        .collect()
}
