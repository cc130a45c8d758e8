//! Category counts table reader.
//!
//! Every column other than the row label and the excluded columns is a raw
//! category label. Blank cells are treated as absent rather than zero.

use std::collections::BTreeMap;
use std::io::Read;

use crime_forecast_dataset_models::{CategoryCountRow, CategoryCountTable};
use serde::Deserialize;

use crate::{DatasetError, parse_count};

/// Column layout of the category counts table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CategoryTableLayout {
    /// Header of the row label column.
    pub label_column: String,
    /// Headers that are never raw category labels.
    pub excluded_columns: Vec<String>,
}

impl Default for CategoryTableLayout {
    fn default() -> Self {
        Self {
            label_column: "City".to_string(),
            excluded_columns: vec!["City".to_string(), "Total".to_string()],
        }
    }
}

/// Reads the category counts table.
///
/// # Errors
///
/// Returns [`DatasetError`] if the CSV is malformed, the table has no raw
/// label columns, or a non-blank cell is not a non-negative count.
pub fn read_category_table<R: Read>(
    reader: R,
    layout: &CategoryTableLayout,
) -> Result<CategoryCountTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();

    let label_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(&layout.label_column));

    let label_columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            !h.is_empty()
                && !layout
                    .excluded_columns
                    .iter()
                    .any(|excluded| h.eq_ignore_ascii_case(excluded))
        })
        .map(|(idx, h)| (idx, h.as_str()))
        .collect();

    if label_columns.is_empty() {
        return Err(DatasetError::Empty(
            "category counts table has no raw label columns".to_string(),
        ));
    }

    let mut rows = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let row_number = row_idx + 1;

        let label = label_idx
            .and_then(|idx| record.get(idx))
            .unwrap_or_default()
            .to_string();

        let mut counts = BTreeMap::new();
        for (col_idx, column) in &label_columns {
            let raw = record.get(*col_idx).unwrap_or_default();
            let value = parse_count(raw).map_err(|()| DatasetError::InvalidValue {
                column: (*column).to_string(),
                row: row_number,
                value: raw.to_string(),
            })?;
            if let Some(value) = value {
                counts.insert((*column).to_string(), value);
            }
        }

        rows.push(CategoryCountRow { label, counts });
    }

    Ok(CategoryCountTable {
        labels: label_columns
            .into_iter()
            .map(|(_, h)| h.to_string())
            .collect(),
        rows,
    })
}
