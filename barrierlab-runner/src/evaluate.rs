//! Label-outcome evaluation of signals.
//!
//! Each actionable signal is settled against the label of its bar: a LONG
//! wins when the label is +1, a SHORT wins when it is -1, the opposite label
//! loses. Bars labeled neutral are not traded. Risk is a fixed fraction of
//! current equity; a win pays `risk * risk_reward_ratio`, a loss costs
//! `risk`. No prices are replayed, the label already encodes which barrier
//! was touched first.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use barrierlab_core::domain::{Direction, Label, SignalRecord};

use crate::labeling::SymbolLabels;
use crate::metrics::PerformanceMetrics;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluateError {
    #[error("initial_capital must be a finite value > 0, got {0}")]
    InitialCapital(f64),

    #[error("risk_per_trade must be in (0, 1], got {0}")]
    RiskPerTrade(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub initial_capital: f64,
    /// Fraction of current equity risked per trade.
    pub risk_per_trade: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            risk_per_trade: 0.01,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<(), EvaluateError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(EvaluateError::InitialCapital(self.initial_capital));
        }
        let r = self.risk_per_trade;
        if !(r.is_finite() && r > 0.0 && r <= 1.0) {
            return Err(EvaluateError::RiskPerTrade(r));
        }
        Ok(())
    }
}

/// One settled signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub direction: Direction,
    pub confidence: f64,
    pub label: Label,
    pub win: bool,
    pub risk: f64,
    pub pnl: f64,
    /// Equity after this trade.
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub trades: Vec<Trade>,
    /// Initial capital followed by equity after each trade.
    pub equity_curve: Vec<f64>,
    pub metrics: PerformanceMetrics,
    /// Actionable signals with no labeled bar to settle against.
    pub unmatched: usize,
    /// Actionable signals on bars labeled neutral, left unsettled.
    pub neutral_skipped: usize,
    pub by_symbol: BTreeMap<String, SymbolPerformance>,
}

/// Per-symbol trade tally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolPerformance {
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
}

fn breakdown(trades: &[Trade]) -> BTreeMap<String, SymbolPerformance> {
    let mut by_symbol: BTreeMap<String, SymbolPerformance> = BTreeMap::new();
    for t in trades {
        let entry = by_symbol.entry(t.symbol.clone()).or_default();
        entry.trades += 1;
        entry.wins += usize::from(t.win);
        entry.total_pnl += t.pnl;
    }
    for perf in by_symbol.values_mut() {
        perf.win_rate = perf.wins as f64 / perf.trades as f64;
    }
    by_symbol
}

/// Settle signals against labels in time order.
pub fn evaluate_signals(
    signals: &[SignalRecord],
    labels: &[SymbolLabels],
    config: &EvaluationConfig,
) -> Result<Evaluation, EvaluateError> {
    config.validate()?;

    let labels_by_symbol: BTreeMap<&str, &SymbolLabels> =
        labels.iter().map(|l| (l.symbol.as_str(), l)).collect();

    let mut ordered: Vec<&SignalRecord> = signals
        .iter()
        .filter(|s| s.direction.is_actionable())
        .collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.symbol.cmp(&b.symbol)));

    let mut equity = config.initial_capital;
    let mut equity_curve = vec![equity];
    let mut trades = Vec::with_capacity(ordered.len());
    let mut unmatched = 0;
    let mut neutral_skipped = 0;

    for signal in ordered {
        let label = labels_by_symbol
            .get(signal.symbol.as_str())
            .and_then(|l| l.label_at(signal.timestamp))
            .filter(|l| !l.is_skipped())
            .map(|l| l.label());
        let Some(label) = label else {
            unmatched += 1;
            continue;
        };
        if label == Label::Neutral {
            neutral_skipped += 1;
            continue;
        }

        let win = matches!(
            (signal.direction, label),
            (Direction::Long, Label::Long) | (Direction::Short, Label::Short)
        );
        let risk = equity * config.risk_per_trade;
        let pnl = if win {
            risk * signal.risk_reward_ratio
        } else {
            -risk
        };
        equity += pnl;
        equity_curve.push(equity);

        trades.push(Trade {
            timestamp: signal.timestamp,
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            confidence: signal.confidence,
            label,
            win,
            risk,
            pnl,
            equity,
        });
    }

    if unmatched > 0 {
        warn!(unmatched, "signals without a labeled bar were ignored");
    }
    debug!(neutral_skipped, "signals on neutral bars left unsettled");

    let metrics = PerformanceMetrics::compute(&equity_curve, &trades, config.initial_capital);
    let by_symbol = breakdown(&trades);
    info!(
        trades = metrics.trade_count,
        win_rate = metrics.win_rate,
        total_return = metrics.total_return,
        "evaluation complete"
    );

    Ok(Evaluation {
        trades,
        equity_curve,
        metrics,
        unmatched,
        neutral_skipped,
        by_symbol,
    })
}
