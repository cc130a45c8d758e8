//! Query implementations.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crime_forecast_analytics_models::{
    CategoryCount, IncidentQuery, IncidentRecord, IncidentStats, RegionFilter, RegionalSummary,
    RiskTier, TrendPoint, YearFilter,
};
use crime_forecast_crime_models::CrimeType;
use crime_forecast_dataset_models::{ALL_REGIONS, CrimeDataset, MonthlyRecord};

/// Region labels for selection: [`ALL_REGIONS`] first, then every region
/// of the dataset in sorted order.
#[must_use]
pub fn list_regions(dataset: &CrimeDataset) -> Vec<String> {
    std::iter::once(ALL_REGIONS)
        .chain(dataset.regions())
        .map(ToString::to_string)
        .collect()
}

/// Category labels for selection: `"All Types"` first, then the taxonomy.
#[must_use]
pub fn list_categories() -> Vec<String> {
    crime_forecast_crime_models::category_labels()
}

/// Parses a year filter string. Anything that is neither `"all"` nor an
/// integer falls back to [`YearFilter::All`].
#[must_use]
pub fn parse_year_filter(value: &str) -> YearFilter {
    value.parse().unwrap_or_else(|e| {
        log::debug!("{e}, using all years");
        YearFilter::All
    })
}

/// Classifies an aggregate incident total.
#[must_use]
pub const fn risk_tier(total: u64) -> RiskTier {
    RiskTier::from_total(total)
}

fn to_incident(record: &MonthlyRecord) -> Option<IncidentRecord> {
    Some(IncidentRecord {
        date: record.date()?,
        year: record.year,
        month: record.month,
        incidents: record.total,
        categories: record.categories.clone(),
    })
}

/// Monthly incident records for a region and year scope, chronological.
///
/// For [`RegionFilter::All`] the records of every region are summed per
/// (year, month), category columns included. An unknown region yields an
/// empty result.
#[must_use]
pub fn query(dataset: &CrimeDataset, region: &RegionFilter, year: YearFilter) -> Vec<IncidentRecord> {
    let in_year = |r: &&MonthlyRecord| year.matches(r.year);

    match region {
        RegionFilter::Region(name) => dataset
            .records_for_region(name)
            .filter(in_year)
            .filter_map(to_incident)
            .collect(),
        RegionFilter::All => {
            let mut months: BTreeMap<(i32, u32), IncidentRecord> = BTreeMap::new();
            for record in dataset.records.iter().filter(in_year) {
                match months.entry((record.year, record.month)) {
                    Entry::Occupied(mut entry) => {
                        let acc = entry.get_mut();
                        acc.incidents += record.total;
                        for (crime_type, count) in &record.categories {
                            *acc.categories.entry(*crime_type).or_default() += count;
                        }
                    }
                    Entry::Vacant(entry) => {
                        if let Some(incident) = to_incident(record) {
                            entry.insert(incident);
                        }
                    }
                }
            }
            months.into_values().collect()
        }
    }
}

fn scoped_total(records: &[IncidentRecord], crime_type: Option<CrimeType>) -> u64 {
    records.iter().map(|r| r.value(crime_type)).sum()
}

/// Chronological incident series for the query scope, restricted to one
/// category's column when the query names a crime type.
#[must_use]
pub fn trend(dataset: &CrimeDataset, query_params: &IncidentQuery) -> Vec<TrendPoint> {
    query(dataset, &query_params.region, query_params.year)
        .iter()
        .map(|r| TrendPoint {
            date: r.date,
            incidents: r.value(query_params.crime_type),
        })
        .collect()
}

/// Total incidents per crime type over the query scope, in taxonomy order.
/// A crime type filter keeps only that type's entry.
#[must_use]
pub fn crime_type_distribution(
    dataset: &CrimeDataset,
    query_params: &IncidentQuery,
) -> Vec<CategoryCount> {
    let records = query(dataset, &query_params.region, query_params.year);

    CrimeType::all()
        .iter()
        .filter(|t| query_params.crime_type.is_none_or(|only| only == **t))
        .map(|crime_type| CategoryCount {
            crime_type: *crime_type,
            count: scoped_total(&records, Some(*crime_type)),
        })
        .collect()
}

/// Incident total and risk tier per region.
///
/// With [`RegionFilter::All`] there is one entry per real region, in sorted
/// order; otherwise a single entry for the selected region.
#[must_use]
pub fn regional_distribution(
    dataset: &CrimeDataset,
    query_params: &IncidentQuery,
) -> Vec<RegionalSummary> {
    let summarize = |name: &str| {
        let records = query(
            dataset,
            &RegionFilter::Region(name.to_string()),
            query_params.year,
        );
        let incidents = scoped_total(&records, query_params.crime_type);
        RegionalSummary {
            region: name.to_string(),
            incidents,
            risk: risk_tier(incidents),
        }
    };

    match &query_params.region {
        RegionFilter::All => dataset.regions().into_iter().map(summarize).collect(),
        RegionFilter::Region(name) => vec![summarize(name)],
    }
}

/// Returns the first key holding the largest value.
fn first_max<K: Copy>(entries: impl IntoIterator<Item = (K, u64)>) -> Option<K> {
    entries
        .into_iter()
        .fold(None, |best: Option<(K, u64)>, (key, value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((key, value)),
        })
        .map(|(key, _)| key)
}

/// Headline statistics for the query scope.
///
/// The risk level classifies the average month, not the total. With no
/// regions at all the top region falls back to the region label.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn incident_stats(dataset: &CrimeDataset, query_params: &IncidentQuery) -> IncidentStats {
    let records = query(dataset, &query_params.region, query_params.year);
    let total_incidents = scoped_total(&records, query_params.crime_type);

    let most_common_type = query_params.crime_type.unwrap_or_else(|| {
        first_max(
            CrimeType::all()
                .iter()
                .map(|t| (*t, scoped_total(&records, Some(*t)))),
        )
        .unwrap_or(CrimeType::FALLBACK)
    });

    let top_region = match &query_params.region {
        RegionFilter::Region(name) => name.clone(),
        RegionFilter::All => first_max(dataset.regions().into_iter().map(|name| {
            let region_records = query(
                dataset,
                &RegionFilter::Region(name.to_string()),
                query_params.year,
            );
            (name, scoped_total(&region_records, None))
        }))
        .unwrap_or(ALL_REGIONS)
        .to_string(),
    };

    let avg_monthly = if records.is_empty() {
        0.0
    } else {
        total_incidents as f64 / records.len() as f64
    };

    IncidentStats {
        total_incidents,
        most_common_type,
        top_region,
        risk_level: RiskTier::from_monthly_average(avg_monthly),
        avg_monthly: avg_monthly as u64,
    }
}

/// Full monthly incident history of a region, the forecast input.
#[must_use]
pub fn region_series(dataset: &CrimeDataset, region: &RegionFilter) -> Vec<TrendPoint> {
    trend(
        dataset,
        &IncidentQuery::new(region.clone(), YearFilter::All),
    )
}

/// Full monthly history of one crime type within a region.
#[must_use]
pub fn crime_type_series(
    dataset: &CrimeDataset,
    region: &RegionFilter,
    crime_type: CrimeType,
) -> Vec<TrendPoint> {
    trend(
        dataset,
        &IncidentQuery::new(region.clone(), YearFilter::All).with_crime_type(Some(crime_type)),
    )
}
