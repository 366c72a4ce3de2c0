//! Serializable run configuration.
//!
//! A run file names the date range, the engine settings, and one scanner and
//! one exit strategy by registry name with numeric parameters:
//!
//! ```toml
//! start_date = "2023-01-03"
//! end_date = "2023-12-29"
//! universe = ["AAPL", "MSFT"]   # optional; omit for every symbol
//!
//! [engine]
//! initial_capital = 100000.0
//! max_positions = 5
//! position_fraction = 0.2
//!
//! [scanner]
//! type = "breakout"
//! params = { lookback = 20, min_volume_ratio = 1.5 }
//!
//! [exit_strategy]
//! type = "swing"
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use swinglab_core::engine::{ConfigError as EngineConfigError, EngineConfig};

/// Content hash of a [`RunConfig`] (blake3, hex).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid run config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("start_date {start} is after end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("universe is present but empty")]
    EmptyUniverse,
    #[error("engine config: {0}")]
    Engine(#[from] EngineConfigError),
    #[error("failed to serialize run config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A registry component selection: `type` plus named numeric parameters.
///
/// Parameters live in a `BTreeMap` so serialization, and therefore the run
/// fingerprint, does not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl ComponentConfig {
    /// A component with default parameters.
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

/// Everything needed to reproduce one backtest over a given price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// First simulated day (inclusive).
    pub start_date: NaiveDate,
    /// Last simulated day (inclusive).
    pub end_date: NaiveDate,
    /// Symbols to trade. `None` trades every symbol in the history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universe: Option<Vec<String>>,
    #[serde(default)]
    pub engine: EngineConfig,
    pub scanner: ComponentConfig,
    pub exit_strategy: ComponentConfig,
}

impl RunConfig {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        scanner: ComponentConfig,
        exit_strategy: ComponentConfig,
    ) -> Self {
        Self {
            start_date,
            end_date,
            universe: None,
            engine: EngineConfig::default(),
            scanner,
            exit_strategy,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML run file. Does not validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that need no registry or price data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_date > self.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if matches!(&self.universe, Some(symbols) if symbols.is_empty()) {
            return Err(ConfigError::EmptyUniverse);
        }
        self.engine.validate()?;
        Ok(())
    }

    /// Deterministic fingerprint: identical configs share a run id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}
