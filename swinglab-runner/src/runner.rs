//! Backtest runner: wires a `RunConfig` through the registry into the engine.
//!
//! Entry points:
//! - `run_config()`: one run over pre-loaded data, no I/O
//! - `run_many()`: independent runs fanned out across threads with rayon
//! - `run_file()`: load a TOML run file, then `run_config()`

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use anyhow::Context;
use swinglab_core::data::PriceHistory;
use swinglab_core::engine::{BacktestEngine, BacktestError, BacktestResults};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::registry::{Registry, RegistryError};
use crate::universe::UniverseHistory;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("backtest failed: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for serialized outcomes.
pub const SCHEMA_VERSION: u32 = 1;

/// A finished run with the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: RunConfig,
    pub results: BacktestResults,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one configuration over pre-loaded data.
pub fn run_config(
    config: &RunConfig,
    history: &dyn PriceHistory,
    registry: &Registry,
) -> Result<RunOutcome, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let scanner = registry.build_scanner(&config.scanner)?;
    let exit_strategy = registry.build_exit(&config.exit_strategy)?;

    let universe = config
        .universe
        .as_ref()
        .map(|symbols| UniverseHistory::new(history, symbols.iter().cloned()));
    if let Some(universe) = &universe {
        let missing = universe.missing();
        if !missing.is_empty() {
            warn!(run_id = %run_id, ?missing, "universe symbols without data");
        }
    }
    let data: &dyn PriceHistory = match &universe {
        Some(universe) => universe,
        None => history,
    };

    let started = Instant::now();
    let engine = BacktestEngine::new(
        config.engine.clone(),
        data,
        scanner.as_ref(),
        exit_strategy.as_ref(),
    )?;
    let results = engine.run(config.start_date, config.end_date)?;
    info!(
        run_id = %run_id,
        trades = results.trades.len(),
        net_pnl = results.net_pnl(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run complete"
    );

    Ok(RunOutcome {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        results,
    })
}

/// Run every configuration independently, in parallel.
///
/// Each run owns its own engine state, so the output equals running the
/// configs one after another; results come back in input order.
pub fn run_many(
    configs: &[RunConfig],
    history: &dyn PriceHistory,
    registry: &Registry,
) -> Vec<Result<RunOutcome, RunError>> {
    info!(runs = configs.len(), "starting parallel runs");
    configs
        .par_iter()
        .map(|config| run_config(config, history, registry))
        .collect()
}

/// Sequential counterpart of [`run_many`].
pub fn run_sequential(
    configs: &[RunConfig],
    history: &dyn PriceHistory,
    registry: &Registry,
) -> Vec<Result<RunOutcome, RunError>> {
    configs
        .iter()
        .map(|config| run_config(config, history, registry))
        .collect()
}

/// Load a TOML run file and run it.
pub fn run_file(
    path: &Path,
    history: &dyn PriceHistory,
    registry: &Registry,
) -> anyhow::Result<RunOutcome> {
    let config = RunConfig::load(path)?;
    run_config(&config, history, registry)
        .with_context(|| format!("run defined in {} failed", path.display()))
}

/// Serialize an outcome as pretty JSON to `path`.
pub fn write_outcome(outcome: &RunOutcome, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("serializing run outcome")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComponentConfig;
    use chrono::NaiveDate;
    use swinglab_core::data::{random_walk, InMemoryHistory, WalkParams};

    fn history() -> InMemoryHistory {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut bars = Vec::new();
        for (seed, symbol) in ["AAA", "BBB", "CCC"].iter().enumerate() {
            bars.extend(random_walk(symbol, start, 200, seed as u64, &WalkParams::default()));
        }
        InMemoryHistory::from_bars(bars).unwrap()
    }

    fn config() -> RunConfig {
        RunConfig::new(
            NaiveDate::from_ymd_opt(2023, 4, 3).unwrap(),
            NaiveDate::from_ymd_opt(2023, 9, 29).unwrap(),
            ComponentConfig::new("breakout").with_param("min_volume_ratio", 0.0),
            ComponentConfig::new("swing"),
        )
    }

    #[test]
    fn single_run_records_components() {
        let outcome = run_config(&config(), &history(), &Registry::default()).unwrap();
        assert_eq!(outcome.results.scanner, "breakout");
        assert_eq!(outcome.results.exit_strategy, "swing");
        assert_eq!(outcome.run_id, config().run_id().unwrap());
        assert_eq!(outcome.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn registry_errors_surface() {
        let mut bad = config();
        bad.exit_strategy = ComponentConfig::new("martingale");
        let err = run_config(&bad, &history(), &Registry::default()).unwrap_err();
        assert!(matches!(err, RunError::Registry(RegistryError::UnknownExit(_))));
    }

    #[test]
    fn config_errors_surface_before_registry() {
        let mut bad = config();
        bad.engine.max_positions = 0;
        bad.scanner = ComponentConfig::new("nope");
        let err = run_config(&bad, &history(), &Registry::default()).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::Engine(_))));
    }

    #[test]
    fn date_range_without_data_is_a_backtest_error() {
        let mut bad = config();
        bad.start_date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        bad.end_date = NaiveDate::from_ymd_opt(2030, 2, 1).unwrap();
        let err = run_config(&bad, &history(), &Registry::default()).unwrap_err();
        assert!(matches!(
            err,
            RunError::Backtest(BacktestError::NoTradingDays { .. })
        ));
    }

    #[test]
    fn universe_restricts_traded_symbols() {
        let mut cfg = config();
        cfg.universe = Some(vec!["BBB".to_string()]);
        let outcome = run_config(&cfg, &history(), &Registry::default()).unwrap();
        assert!(outcome.results.trades.iter().all(|t| t.symbol == "BBB"));
    }
}
