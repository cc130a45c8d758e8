//! Pipeline configuration.
//!
//! The default configuration is embedded from `config/default.toml`. Override
//! files only need the keys they change. The dataset directory can also be
//! set through [`DATASET_DIR_ENV`].

use std::path::{Path, PathBuf};

use crime_forecast_dataset::DatasetConfig;
use crime_forecast_forecast::ForecastConfig;
use crime_forecast_synthesis::SynthesisConfig;
use serde::Deserialize;

/// Environment variable overriding [`DatasetConfig::dir`].
pub const DATASET_DIR_ENV: &str = "CRIME_FORECAST_DATASET_DIR";

/// Embedded default configuration.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`PipelineConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Source table locations and layouts.
    pub dataset: DatasetConfig,
    /// Synthesis parameters.
    pub synthesis: SynthesisConfig,
    /// Forecast model parameters.
    pub forecast: ForecastConfig,
}

impl PipelineConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `toml` is malformed or holds a
    /// value of the wrong type.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// The embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    /// Loads `path` if given, the embedded defaults otherwise, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_path(path)?
            }
            None => Self::embedded()?,
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from a variable lookup such as the process
    /// environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATASET_DIR_ENV).filter(|dir| !dir.trim().is_empty()) {
            log::debug!("{DATASET_DIR_ENV} overrides dataset dir with {dir}");
            self.dataset.dir = PathBuf::from(dir);
        }
    }
}
