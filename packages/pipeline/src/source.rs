//! Where the source tables come from.

use crime_forecast_dataset::{DatasetConfig, DatasetError, SourceTables, load_tables};

/// A provider of the two source tables.
///
/// The pipeline calls [`DatasetSource::load`] at most once per context.
pub trait DatasetSource: Send + Sync {
    /// Human-readable description used in logs.
    fn describe(&self) -> String;

    /// Loads both source tables.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the tables are missing or malformed.
    fn load(&self) -> Result<SourceTables, DatasetError>;
}

/// Reads the CSV tables from a directory.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    config: DatasetConfig,
}

impl CsvDirectorySource {
    /// Creates a source for the files named in `config`.
    #[must_use]
    pub const fn new(config: DatasetConfig) -> Self {
        Self { config }
    }
}

impl DatasetSource for CsvDirectorySource {
    fn describe(&self) -> String {
        format!("CSV directory {}", self.config.dir.display())
    }

    fn load(&self) -> Result<SourceTables, DatasetError> {
        load_tables(&self.config)
    }
}

/// Tables already held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    tables: SourceTables,
}

impl InMemorySource {
    /// Wraps preloaded tables.
    #[must_use]
    pub const fn new(tables: SourceTables) -> Self {
        Self { tables }
    }
}

impl DatasetSource for InMemorySource {
    fn describe(&self) -> String {
        format!("in-memory tables ({} regions)", self.tables.annual.records.len())
    }

    fn load(&self) -> Result<SourceTables, DatasetError> {
        Ok(self.tables.clone())
    }
}
