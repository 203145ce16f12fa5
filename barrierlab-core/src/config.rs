//! Barrier engine configuration.
//!
//! One `BarrierConfig` value drives both label generation and live signal
//! generation. It is validated once, when it is loaded or handed to
//! `BarrierEngine::new`, never mid-run.
//!
//! TOML layout (every key optional, defaults shown):
//!
//! ```toml
//! tp_atr_mult = 1.8
//! sl_atr_mult = 1.0
//! min_horizon = 3
//! max_horizon = 10
//! confidence_threshold = 0.7
//!
//! [regime]
//! trend_strength_threshold = 30.0
//! trend_tp_mult = 2.5
//! low_vol_ratio = 0.8
//! low_vol_tp_mult = 1.5
//! high_vol_ratio = 1.2
//! extreme_vol_ratio = 1.5
//! high_vol_horizon_scale = 0.7
//! extreme_vol_horizon_scale = 0.5
//! low_vol_horizon_scale = 1.3
//! low_vol_horizon_cap = 13
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config TOML: {0}")]
    Parse(String),

    #[error("{field} must be a finite value > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("min_horizon must be >= 1")]
    ZeroHorizon,

    #[error("min_horizon ({min}) exceeds max_horizon ({max})")]
    HorizonOrder { min: usize, max: usize },

    #[error(
        "confidence_threshold must be in (0.5, 1.0], got {0}; \
         a threshold <= 0.5 leaves no neutral zone"
    )]
    ConfidenceThreshold(f64),

    #[error("regime thresholds must satisfy low_vol_ratio < high_vol_ratio <= extreme_vol_ratio, got {low} / {high} / {extreme}")]
    RegimeOrder { low: f64, high: f64, extreme: f64 },

    #[error("regime.trend_strength_threshold must be finite and >= 0, got {0}")]
    TrendThreshold(f64),

    #[error("regime.low_vol_horizon_cap must be >= 1")]
    ZeroHorizonCap,
}

/// Regime-dependent adjustments applied by the parameter selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegimeTable {
    /// Trend strength above this selects `trend_tp_mult`.
    pub trend_strength_threshold: f64,
    pub trend_tp_mult: f64,
    /// Volatility ratio below this is a low-volatility (ranging) regime.
    pub low_vol_ratio: f64,
    pub low_vol_tp_mult: f64,
    /// Volatility ratio above this shortens the horizon.
    pub high_vol_ratio: f64,
    /// Volatility ratio above this shortens the horizon further.
    pub extreme_vol_ratio: f64,
    pub high_vol_horizon_scale: f64,
    pub extreme_vol_horizon_scale: f64,
    pub low_vol_horizon_scale: f64,
    /// Upper bound on the extended low-volatility horizon.
    pub low_vol_horizon_cap: usize,
}

impl Default for RegimeTable {
    fn default() -> Self {
        Self {
            trend_strength_threshold: 30.0,
            trend_tp_mult: 2.5,
            low_vol_ratio: 0.8,
            low_vol_tp_mult: 1.5,
            high_vol_ratio: 1.2,
            extreme_vol_ratio: 1.5,
            high_vol_horizon_scale: 0.7,
            extreme_vol_horizon_scale: 0.5,
            low_vol_horizon_scale: 1.3,
            low_vol_horizon_cap: 13,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BarrierConfig {
    /// Default take-profit distance in ATR multiples.
    pub tp_atr_mult: f64,
    /// Stop-loss distance in ATR multiples. Never regime-adjusted.
    pub sl_atr_mult: f64,
    /// Floor for shortened horizons.
    pub min_horizon: usize,
    /// Baseline horizon H, in bars.
    pub max_horizon: usize,
    /// Probability needed for a LONG; `1 - threshold` or less gives a SHORT.
    pub confidence_threshold: f64,
    pub regime: RegimeTable,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            tp_atr_mult: 1.8,
            sl_atr_mult: 1.0,
            min_horizon: 3,
            max_horizon: 10,
            confidence_threshold: 0.7,
            regime: RegimeTable::default(),
        }
    }
}

impl BarrierConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: BarrierConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML (used by `barrierlab config`).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject inconsistent settings before any scanning begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tp_atr_mult", self.tp_atr_mult)?;
        positive("sl_atr_mult", self.sl_atr_mult)?;

        if self.min_horizon == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        if self.min_horizon > self.max_horizon {
            return Err(ConfigError::HorizonOrder {
                min: self.min_horizon,
                max: self.max_horizon,
            });
        }

        let t = self.confidence_threshold;
        if !(t.is_finite() && t > 0.5 && t <= 1.0) {
            return Err(ConfigError::ConfidenceThreshold(t));
        }

        let r = &self.regime;
        if !(r.trend_strength_threshold.is_finite() && r.trend_strength_threshold >= 0.0) {
            return Err(ConfigError::TrendThreshold(r.trend_strength_threshold));
        }
        positive("regime.trend_tp_mult", r.trend_tp_mult)?;
        positive("regime.low_vol_tp_mult", r.low_vol_tp_mult)?;
        positive("regime.low_vol_ratio", r.low_vol_ratio)?;
        positive("regime.high_vol_ratio", r.high_vol_ratio)?;
        positive("regime.extreme_vol_ratio", r.extreme_vol_ratio)?;
        if !(r.low_vol_ratio < r.high_vol_ratio && r.high_vol_ratio <= r.extreme_vol_ratio) {
            return Err(ConfigError::RegimeOrder {
                low: r.low_vol_ratio,
                high: r.high_vol_ratio,
                extreme: r.extreme_vol_ratio,
            });
        }
        positive("regime.high_vol_horizon_scale", r.high_vol_horizon_scale)?;
        positive("regime.extreme_vol_horizon_scale", r.extreme_vol_horizon_scale)?;
        positive("regime.low_vol_horizon_scale", r.low_vol_horizon_scale)?;
        if r.low_vol_horizon_cap == 0 {
            return Err(ConfigError::ZeroHorizonCap);
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}
