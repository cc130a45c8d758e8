//! Annual totals table reader.
//!
//! The table has a row-kind column distinguishing per-region rows from
//! aggregate rows, a region name column, and one numeric column per real
//! year. Year columns are detected from the header; they must form a
//! contiguous window.

use std::io::Read;

use crime_forecast_dataset_models::{AnnualRecord, AnnualTable};
use serde::Deserialize;

use crate::{DatasetError, parse_count};

/// Column layout of the annual totals table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AnnualTableLayout {
    /// Header of the region name column.
    pub region_column: String,
    /// Accepted headers for the row-kind column, first match wins.
    pub kind_columns: Vec<String>,
    /// Row-kind value marking a per-region row.
    pub region_kind: String,
}

impl Default for AnnualTableLayout {
    fn default() -> Self {
        Self {
            region_column: "State/UT".to_string(),
            // The source file ships with the misspelled header.
            kind_columns: vec!["Categroy".to_string(), "Category".to_string()],
            region_kind: "State".to_string(),
        }
    }
}

/// Reads the annual totals table.
///
/// Only rows whose kind column equals [`AnnualTableLayout::region_kind`]
/// (case-insensitive) become records; aggregate rows are skipped.
///
/// # Errors
///
/// Returns [`DatasetError`] if the CSV is malformed, a required column is
/// missing, the year columns are absent or not contiguous, a region row has
/// a missing or invalid year value, or no region rows remain.
pub fn read_annual_table<R: Read>(
    reader: R,
    layout: &AnnualTableLayout,
) -> Result<AnnualTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();

    let region_idx = find_column(&headers, &layout.region_column)
        .ok_or_else(|| DatasetError::MissingColumn(layout.region_column.clone()))?;
    let kind_idx = layout
        .kind_columns
        .iter()
        .find_map(|name| find_column(&headers, name))
        .ok_or_else(|| DatasetError::MissingColumn(layout.kind_columns.join(" | ")))?;

    let year_columns = year_columns(&headers)?;
    let first_year = year_columns[0].1;
    let last_year = year_columns[year_columns.len() - 1].1;

    let mut records = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let row = result?;
        let row_number = row_idx + 1;

        let kind = row.get(kind_idx).unwrap_or_default();
        if !kind.eq_ignore_ascii_case(&layout.region_kind) {
            log::debug!("Skipping non-region row {row_number} (kind '{kind}')");
            continue;
        }

        let region = row.get(region_idx).unwrap_or_default();
        if region.is_empty() {
            log::warn!("Skipping region row {row_number} with empty name");
            continue;
        }

        let mut record = AnnualRecord::new(region);
        for (col_idx, year) in &year_columns {
            let raw = row.get(*col_idx).unwrap_or_default();
            let value = parse_count(raw)
                .ok()
                .flatten()
                .ok_or_else(|| DatasetError::InvalidValue {
                    column: headers[*col_idx].clone(),
                    row: row_number,
                    value: raw.to_string(),
                })?;
            record.totals.insert(*year, value);
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(DatasetError::Empty(format!(
            "no rows with kind '{}' in annual totals table",
            layout.region_kind
        )));
    }

    Ok(AnnualTable {
        records,
        first_year,
        last_year,
    })
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

/// Detects `(column index, year)` pairs, sorted by year, and checks that
/// the years are contiguous.
fn year_columns(headers: &[String]) -> Result<Vec<(usize, i32)>, DatasetError> {
    let mut columns: Vec<(usize, i32)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            let year = header.trim().parse::<i32>().ok()?;
            (1900..=2100).contains(&year).then_some((idx, year))
        })
        .collect();

    if columns.is_empty() {
        return Err(DatasetError::YearWindow(
            "no year columns in header".to_string(),
        ));
    }

    columns.sort_by_key(|(_, year)| *year);

    for pair in columns.windows(2) {
        if pair[1].1 != pair[0].1 + 1 {
            return Err(DatasetError::YearWindow(format!(
                "years {} and {} are not contiguous",
                pair[0].1, pair[1].1
            )));
        }
    }

    Ok(columns)
}
