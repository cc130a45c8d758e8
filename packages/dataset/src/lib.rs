#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV loaders for the two source tables behind the synthesized dataset.
//!
//! [`annual`] reads the sparse per-region annual totals table and
//! [`categories`] reads the per-region raw category counts. Raw category
//! labels are normalized into the canonical taxonomy by [`type_mapping`].
//!
//! Loading is deliberately thin: header detection, numeric parsing and row
//! filtering. Everything statistical happens in the synthesis crate.

pub mod annual;
pub mod categories;
pub mod type_mapping;

use std::path::{Path, PathBuf};

use crime_forecast_dataset_models::{AnnualTable, CategoryCountTable};
use serde::Deserialize;

pub use annual::{AnnualTableLayout, read_annual_table};
pub use categories::{CategoryTableLayout, read_category_table};

/// Default file name of the annual totals table.
pub const DEFAULT_ANNUAL_FILE: &str = "RS_Session_266_AU_226_A_i.csv";

/// Default file name of the category counts table.
pub const DEFAULT_CATEGORY_FILE: &str = "Dataset_CyberCrime_Sean.csv";

/// Errors that can occur while loading the source tables.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// A source file could not be opened or read.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A cell could not be interpreted as a non-negative count.
    #[error("Invalid value '{value}' in column '{column}' (row {row})")]
    InvalidValue {
        /// Column header.
        column: String,
        /// 1-based data row number.
        row: usize,
        /// Offending cell content.
        value: String,
    },

    /// The table has no usable year columns or they are not contiguous.
    #[error("Invalid year window: {0}")]
    YearWindow(String),

    /// The table contained no usable rows.
    #[error("Empty table: {0}")]
    Empty(String),
}

/// Where the two source tables live and how they are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DatasetConfig {
    /// Directory holding both CSV files.
    pub dir: PathBuf,
    /// Annual totals file name, relative to `dir`.
    pub annual_file: String,
    /// Category counts file name, relative to `dir`.
    pub category_file: String,
    /// Column layout of the annual totals table.
    pub annual: AnnualTableLayout,
    /// Column layout of the category counts table.
    pub categories: CategoryTableLayout,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("datasets"),
            annual_file: DEFAULT_ANNUAL_FILE.to_string(),
            category_file: DEFAULT_CATEGORY_FILE.to_string(),
            annual: AnnualTableLayout::default(),
            categories: CategoryTableLayout::default(),
        }
    }
}

impl DatasetConfig {
    /// Full path of the annual totals table.
    #[must_use]
    pub fn annual_path(&self) -> PathBuf {
        self.dir.join(&self.annual_file)
    }

    /// Full path of the category counts table.
    #[must_use]
    pub fn category_path(&self) -> PathBuf {
        self.dir.join(&self.category_file)
    }
}

/// Both source tables, loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTables {
    /// Real annual window per region.
    pub annual: AnnualTable,
    /// Raw category counts.
    pub categories: CategoryCountTable,
}

/// Loads both tables from the locations described by `config`.
///
/// # Errors
///
/// Returns [`DatasetError`] if either file is missing or malformed.
pub fn load_tables(config: &DatasetConfig) -> Result<SourceTables, DatasetError> {
    let annual_path = config.annual_path();
    log::info!("Loading annual totals from {}", annual_path.display());
    let annual = read_annual_table(open(&annual_path)?, &config.annual)?;
    log::info!(
        "Loaded {} region records ({}-{})",
        annual.records.len(),
        annual.first_year,
        annual.last_year
    );

    let category_path = config.category_path();
    log::info!("Loading category counts from {}", category_path.display());
    let categories = read_category_table(open(&category_path)?, &config.categories)?;
    log::info!(
        "Loaded {} category rows across {} raw labels",
        categories.rows.len(),
        categories.labels.len()
    );

    Ok(SourceTables { annual, categories })
}

fn open(path: &Path) -> Result<std::fs::File, DatasetError> {
    std::fs::File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a count cell.
///
/// Blank cells and common missing-value markers yield `None`. Whole-valued
/// floats (`"12.0"`) and thousands separators (`"1,204"`) are accepted.
pub(crate) fn parse_count(raw: &str) -> Result<Option<u64>, ()> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() || matches!(cleaned.as_str(), "-" | "NA" | "N/A" | "nan" | "NaN") {
        return Ok(None);
    }
    if let Ok(value) = cleaned.parse::<u64>() {
        return Ok(Some(value));
    }
    match cleaned.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
            Ok(Some(value as u64))
        }
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn parse_count_accepts_common_shapes() {
        assert_eq!(parse_count("42"), Ok(Some(42)));
        assert_eq!(parse_count(" 1,204 "), Ok(Some(1204)));
        assert_eq!(parse_count("12.0"), Ok(Some(12)));
        assert_eq!(parse_count(""), Ok(None));
        assert_eq!(parse_count("NA"), Ok(None));
        assert_eq!(parse_count("-3"), Err(()));
        assert_eq!(parse_count("1.5"), Err(()));
        assert_eq!(parse_count("lots"), Err(()));
    }

    #[test]
    fn load_tables_reads_both_files_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut annual = std::fs::File::create(dir.path().join(DEFAULT_ANNUAL_FILE)).unwrap();
        writeln!(annual, "Sl. No.,Categroy,State/UT,2018,2019").unwrap();
        writeln!(annual, "1,State,Kerala,340,307").unwrap();
        writeln!(annual, "2,Total (States),Total,340,307").unwrap();
        let mut cats = std::fs::File::create(dir.path().join(DEFAULT_CATEGORY_FILE)).unwrap();
        writeln!(cats, "City,Fraud,Prank,Total").unwrap();
        writeln!(cats, "Kochi,10,2,12").unwrap();

        let config = DatasetConfig {
            dir: dir.path().to_path_buf(),
            ..DatasetConfig::default()
        };
        let tables = load_tables(&config).unwrap();
        assert_eq!(tables.annual.records.len(), 1);
        assert_eq!(tables.annual.first_year, 2018);
        assert_eq!(tables.categories.labels, vec!["Fraud", "Prank"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig {
            dir: dir.path().to_path_buf(),
            ..DatasetConfig::default()
        };
        let err = load_tables(&config).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }), "got {err:?}");
    }
}
