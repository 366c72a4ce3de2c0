//! Registry: resolves `ComponentConfig`s into scanner and exit-strategy trait objects.
//!
//! The built-in table covers `breakout`, `pullback`, `swing` and
//! `scaled_swing`. Callers can register their own factories under new names
//! (or replace a built-in) without touching the engine.
//!
//! Factories validate parameters before construction: a bad config is a
//! `RegistryError`, never a panic inside a component constructor.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use swinglab_core::components::exit::ProfitTier;
use swinglab_core::components::{
    BreakoutScanner, ExitStrategy, PullbackScanner, ScaledSwingExit, Scanner, SwingExit,
    SwingParams,
};

use crate::config::ComponentConfig;

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("unknown scanner type: {0}")]
    UnknownScanner(String),
    #[error("unknown exit strategy type: {0}")]
    UnknownExit(String),
    #[error("{component}: unknown parameter '{param}'")]
    UnknownParam { component: String, param: String },
    #[error("{component}: invalid {param} = {value}: {reason}")]
    InvalidParam {
        component: String,
        param: String,
        value: f64,
        reason: &'static str,
    },
}

pub type ScannerFactory =
    Box<dyn Fn(&ComponentConfig) -> Result<Box<dyn Scanner>, RegistryError> + Send + Sync>;
pub type ExitFactory =
    Box<dyn Fn(&ComponentConfig) -> Result<Box<dyn ExitStrategy>, RegistryError> + Send + Sync>;

/// Name → factory lookup for scanners and exit strategies.
pub struct Registry {
    scanners: BTreeMap<String, ScannerFactory>,
    exits: BTreeMap<String, ExitFactory>,
}

impl Registry {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self {
            scanners: BTreeMap::new(),
            exits: BTreeMap::new(),
        }
    }

    /// A registry preloaded with the reference components.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_scanner("breakout", build_breakout);
        registry.register_scanner("pullback", build_pullback);
        registry.register_exit("swing", build_swing);
        registry.register_exit("scaled_swing", build_scaled_swing);
        registry
    }

    pub fn register_scanner<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ComponentConfig) -> Result<Box<dyn Scanner>, RegistryError> + Send + Sync + 'static,
    {
        self.scanners.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_exit<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ComponentConfig) -> Result<Box<dyn ExitStrategy>, RegistryError>
            + Send
            + Sync
            + 'static,
    {
        self.exits.insert(name.to_string(), Box::new(factory));
    }

    pub fn scanner_names(&self) -> Vec<&str> {
        self.scanners.keys().map(String::as_str).collect()
    }

    pub fn exit_names(&self) -> Vec<&str> {
        self.exits.keys().map(String::as_str).collect()
    }

    pub fn build_scanner(&self, config: &ComponentConfig) -> Result<Box<dyn Scanner>, RegistryError> {
        let factory = self
            .scanners
            .get(&config.component_type)
            .ok_or_else(|| RegistryError::UnknownScanner(config.component_type.clone()))?;
        factory(config)
    }

    pub fn build_exit(
        &self,
        config: &ComponentConfig,
    ) -> Result<Box<dyn ExitStrategy>, RegistryError> {
        let factory = self
            .exits
            .get(&config.component_type)
            .ok_or_else(|| RegistryError::UnknownExit(config.component_type.clone()))?;
        factory(config)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("scanners", &self.scanner_names())
            .field("exits", &self.exit_names())
            .finish()
    }
}

// ─── Parameter helpers ───────────────────────────────────────────────

/// Typed access to a component's parameters with per-key validation.
struct Params<'a> {
    config: &'a ComponentConfig,
}

impl<'a> Params<'a> {
    /// Rejects keys outside `known` (and outside `extra`, if given).
    fn new(
        config: &'a ComponentConfig,
        known: &[&str],
        extra: impl Fn(&str) -> bool,
    ) -> Result<Self, RegistryError> {
        if let Some(key) = config
            .params
            .keys()
            .find(|k| !known.contains(&k.as_str()) && !extra(k.as_str()))
        {
            return Err(RegistryError::UnknownParam {
                component: config.component_type.clone(),
                param: key.clone(),
            });
        }
        Ok(Self { config })
    }

    fn invalid(&self, param: &str, value: f64, reason: &'static str) -> RegistryError {
        RegistryError::InvalidParam {
            component: self.config.component_type.clone(),
            param: param.to_string(),
            value,
            reason,
        }
    }

    fn raw(&self, name: &str) -> Option<f64> {
        self.config.params.get(name).copied()
    }

    fn f64(&self, name: &str, default: f64) -> Result<f64, RegistryError> {
        let value = self.raw(name).unwrap_or(default);
        if !value.is_finite() {
            return Err(self.invalid(name, value, "must be finite"));
        }
        Ok(value)
    }

    /// A value in the open interval (0, 1).
    fn unit(&self, name: &str, default: f64) -> Result<f64, RegistryError> {
        let value = self.f64(name, default)?;
        if value <= 0.0 || value >= 1.0 {
            return Err(self.invalid(name, value, "must be in (0, 1)"));
        }
        Ok(value)
    }

    fn non_negative(&self, name: &str, default: f64) -> Result<f64, RegistryError> {
        let value = self.f64(name, default)?;
        if value < 0.0 {
            return Err(self.invalid(name, value, "must be non-negative"));
        }
        Ok(value)
    }

    /// A whole number >= 1.
    fn period(&self, name: &str, default: usize) -> Result<usize, RegistryError> {
        let Some(value) = self.raw(name) else {
            return Ok(default);
        };
        if !value.is_finite() || value.fract() != 0.0 || value < 1.0 {
            return Err(self.invalid(name, value, "must be a whole number >= 1"));
        }
        Ok(value as usize)
    }
}

// ─── Scanner factories ───────────────────────────────────────────────

const BREAKOUT_KEYS: &[&str] = &[
    "lookback",
    "trend_period",
    "volume_period",
    "min_volume_ratio",
    "stop_pct",
];

fn build_breakout(config: &ComponentConfig) -> Result<Box<dyn Scanner>, RegistryError> {
    let p = Params::new(config, BREAKOUT_KEYS, |_| false)?;
    Ok(Box::new(BreakoutScanner::new(
        p.period("lookback", 20)?,
        p.period("trend_period", 50)?,
        p.period("volume_period", 20)?,
        p.non_negative("min_volume_ratio", 1.5)?,
        p.unit("stop_pct", 0.08)?,
    )))
}

const PULLBACK_KEYS: &[&str] = &["short_period", "long_period", "band_pct", "stop_pct"];

fn build_pullback(config: &ComponentConfig) -> Result<Box<dyn Scanner>, RegistryError> {
    let p = Params::new(config, PULLBACK_KEYS, |_| false)?;
    let short_period = p.period("short_period", 10)?;
    let long_period = p.period("long_period", 50)?;
    if short_period >= long_period {
        return Err(p.invalid(
            "short_period",
            short_period as f64,
            "must be below long_period",
        ));
    }
    Ok(Box::new(PullbackScanner::new(
        short_period,
        long_period,
        p.non_negative("band_pct", 0.02)?,
        p.unit("stop_pct", 0.08)?,
    )))
}

// ─── Exit factories ──────────────────────────────────────────────────

const SWING_KEYS: &[&str] = &[
    "trail_activation",
    "atr_period",
    "wide_atr_mult",
    "tight_atr_mult",
    "tighten_at",
    "fixed_trail_at",
    "fixed_trail_pct",
    "protect_gains",
    "trend_sma",
    "fade_threshold",
    "fade_window",
    "max_hold_days",
];

fn swing_params(p: &Params<'_>) -> Result<SwingParams, RegistryError> {
    let d = SwingParams::default();
    Ok(SwingParams {
        trail_activation: p.non_negative("trail_activation", d.trail_activation)?,
        atr_period: p.period("atr_period", d.atr_period)?,
        wide_atr_mult: p.non_negative("wide_atr_mult", d.wide_atr_mult)?,
        tight_atr_mult: p.non_negative("tight_atr_mult", d.tight_atr_mult)?,
        tighten_at: p.non_negative("tighten_at", d.tighten_at)?,
        fixed_trail_at: p.non_negative("fixed_trail_at", d.fixed_trail_at)?,
        fixed_trail_pct: p.unit("fixed_trail_pct", d.fixed_trail_pct)?,
        protect_gains: p.f64("protect_gains", d.protect_gains)?,
        trend_sma: p.period("trend_sma", d.trend_sma)?,
        fade_threshold: p.non_negative("fade_threshold", d.fade_threshold)?,
        fade_window: p.period("fade_window", d.fade_window)?,
        max_hold_days: p.period("max_hold_days", d.max_hold_days)?,
    })
}

fn build_swing(config: &ComponentConfig) -> Result<Box<dyn ExitStrategy>, RegistryError> {
    let p = Params::new(config, SWING_KEYS, |_| false)?;
    Ok(Box::new(SwingExit::new(swing_params(&p)?)))
}

/// `tier_<n>_gain` / `tier_<n>_fraction`, numbered from 1.
fn is_tier_key(key: &str) -> bool {
    key.strip_prefix("tier_")
        .and_then(|rest| {
            rest.strip_suffix("_gain")
                .or_else(|| rest.strip_suffix("_fraction"))
        })
        .is_some_and(|n| n.parse::<usize>().is_ok_and(|n| n >= 1))
}

fn profit_tiers(p: &Params<'_>) -> Result<Vec<ProfitTier>, RegistryError> {
    if !p.config.params.keys().any(|k| is_tier_key(k)) {
        return Ok(ScaledSwingExit::default_params().tiers().to_vec());
    }

    let mut tiers = Vec::new();
    for n in 1.. {
        let gain_key = format!("tier_{n}_gain");
        let fraction_key = format!("tier_{n}_fraction");
        match (p.raw(&gain_key), p.raw(&fraction_key)) {
            (None, None) => break,
            (Some(gain), Some(fraction)) => {
                if !gain.is_finite() || gain <= 0.0 {
                    return Err(p.invalid(&gain_key, gain, "must be positive"));
                }
                if !(fraction > 0.0 && fraction <= 1.0) {
                    return Err(p.invalid(&fraction_key, fraction, "must be in (0, 1]"));
                }
                if tiers.last().is_some_and(|t: &ProfitTier| t.gain >= gain) {
                    return Err(p.invalid(&gain_key, gain, "tier gains must ascend"));
                }
                tiers.push(ProfitTier::new(gain, fraction));
            }
            (Some(gain), None) => {
                return Err(p.invalid(&gain_key, gain, "tier has no matching fraction"))
            }
            (None, Some(fraction)) => {
                return Err(p.invalid(&fraction_key, fraction, "tier has no matching gain"))
            }
        }
    }

    // Tiers past a gap would be silently ignored.
    if let Some(stray) = p.config.params.keys().find(|k| {
        is_tier_key(k)
            && k.trim_start_matches("tier_")
                .split('_')
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .is_some_and(|n| n > tiers.len())
    }) {
        let value = p.config.params[stray];
        return Err(p.invalid(stray, value, "tiers must be numbered contiguously from 1"));
    }

    let total: f64 = tiers.iter().map(|t| t.fraction).sum();
    if total > 1.0 + 1e-9 {
        return Err(p.invalid("tier fractions", total, "must sum to at most 1"));
    }
    Ok(tiers)
}

fn build_scaled_swing(config: &ComponentConfig) -> Result<Box<dyn ExitStrategy>, RegistryError> {
    let p = Params::new(config, SWING_KEYS, is_tier_key)?;
    let inner = SwingExit::new(swing_params(&p)?);
    Ok(Box::new(ScaledSwingExit::new(profit_tiers(&p)?, inner)))
}
