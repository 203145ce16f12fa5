//! Barrier parameter selection and price levels.
//!
//! `select_parameters` maps a regime snapshot to (take-profit multiple,
//! stop-loss multiple, horizon). It is pure: labeling and signal generation
//! call the same function with the same configuration.

use serde::{Deserialize, Serialize};

use crate::config::BarrierConfig;
use crate::domain::RegimeSnapshot;

/// Concrete barrier parameters for one entry bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierParams {
    /// Take-profit distance in ATR multiples.
    pub tp_mult: f64,
    /// Stop-loss distance in ATR multiples.
    pub sl_mult: f64,
    /// Number of future bars to scan.
    pub horizon: usize,
}

impl BarrierParams {
    pub fn risk_reward_ratio(&self) -> f64 {
        self.tp_mult / self.sl_mult
    }
}

/// Select barrier parameters for a regime.
///
/// Take-profit: trend override first, then the low-volatility tightening,
/// else the configured default. Stop-loss is always the configured default.
/// Horizon shrinks in high/extreme volatility (floored at `min_horizon`) and
/// stretches in low volatility (capped at `low_vol_horizon_cap`).
pub fn select_parameters(regime: &RegimeSnapshot, config: &BarrierConfig) -> BarrierParams {
    let table = &config.regime;
    let vol = regime.volatility_ratio;

    let tp_mult = if regime.trend_strength > table.trend_strength_threshold {
        table.trend_tp_mult
    } else if vol < table.low_vol_ratio {
        table.low_vol_tp_mult
    } else {
        config.tp_atr_mult
    };

    let base = config.max_horizon;
    let horizon = if vol > table.extreme_vol_ratio {
        scaled(base, table.extreme_vol_horizon_scale).max(config.min_horizon)
    } else if vol > table.high_vol_ratio {
        scaled(base, table.high_vol_horizon_scale).max(config.min_horizon)
    } else if vol < table.low_vol_ratio {
        scaled(base, table.low_vol_horizon_scale).min(table.low_vol_horizon_cap)
    } else {
        base
    };

    BarrierParams {
        tp_mult,
        sl_mult: config.sl_atr_mult,
        horizon,
    }
}

/// round(base * scale), never below one bar.
fn scaled(base: usize, scale: f64) -> usize {
    ((base as f64 * scale).round() as usize).max(1)
}

/// Barrier prices for both hypotheses around one entry price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierLevels {
    pub entry: f64,
    pub tp_long: f64,
    pub sl_long: f64,
    pub tp_short: f64,
    pub sl_short: f64,
}

impl BarrierLevels {
    /// Levels at `entry ± mult * atr`.
    pub fn new(entry: f64, atr: f64, tp_mult: f64, sl_mult: f64) -> Self {
        let tp_dist = tp_mult * atr;
        let sl_dist = sl_mult * atr;
        Self {
            entry,
            tp_long: entry + tp_dist,
            sl_long: entry - sl_dist,
            tp_short: entry - tp_dist,
            sl_short: entry + sl_dist,
        }
    }

    pub fn from_params(entry: f64, atr: f64, params: &BarrierParams) -> Self {
        Self::new(entry, atr, params.tp_mult, params.sl_mult)
    }
}
