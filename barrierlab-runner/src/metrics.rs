//! Performance metrics: pure functions over an equity curve and trade list.
//!
//! No dependencies on the loader, labeler or engine.

use serde::{Deserialize, Serialize};

use crate::evaluate::Trade;

/// Aggregate metrics for one label-outcome evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub total_return: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_r: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub final_equity: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade list.
    pub fn compute(equity_curve: &[f64], trades: &[Trade], initial_capital: f64) -> Self {
        let wins = trades.iter().filter(|t| t.win).count();
        Self {
            trade_count: trades.len(),
            wins,
            losses: trades.len() - wins,
            win_rate: win_rate(trades),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            total_return: total_return(equity_curve),
            profit_factor: profit_factor(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            avg_r: avg_r(trades),
            max_drawdown: max_drawdown(equity_curve),
            sharpe: sharpe_ratio(equity_curve),
            final_equity: equity_curve.last().copied().unwrap_or(initial_capital),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    let (Some(&initial), Some(&final_eq)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial
}

/// Annualized Sharpe ratio of step returns.
///
/// Sharpe = mean(returns) / std(returns) * sqrt(252). Each step of the curve
/// is one trade. Returns 0.0 if variance is zero or fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = step_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&returns) / std) * (252.0_f64).sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Fraction of trades that were winners.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.win).count() as f64 / trades.len() as f64
}

/// Gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean P&L of winning trades.
pub fn avg_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
    mean_f64(&wins)
}

/// Mean absolute P&L of losing trades.
pub fn avg_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .collect();
    mean_f64(&losses)
}

/// Expectancy in R: mean P&L over mean risk.
pub fn avg_r(trades: &[Trade]) -> f64 {
    let risk: Vec<f64> = trades.iter().map(|t| t.risk).collect();
    let mean_risk = mean_f64(&risk);
    if mean_risk <= 0.0 {
        return 0.0;
    }
    let pnl: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
    mean_f64(&pnl) / mean_risk
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Step-to-step returns of an equity curve.
pub fn step_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.win == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrierlab_core::domain::{Direction, Label};
    use chrono::NaiveDate;

    fn make_trade(pnl: f64, risk: f64) -> Trade {
        Trade {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            symbol: "EURUSD".into(),
            direction: Direction::Long,
            confidence: 0.8,
            label: if pnl > 0.0 { Label::Long } else { Label::Short },
            win: pnl > 0.0,
            risk,
            pnl,
            equity: 0.0,
        }
    }

    // ── Total return ──

    #[test]
    fn total_return_positive() {
        let eq = vec![10_000.0, 10_100.0, 11_000.0];
        assert!((total_return(&eq) - 0.1).abs() < 1e-10);
    }

    #[test]
    fn total_return_degenerate() {
        assert_eq!(total_return(&[10_000.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
    }

    // ── Sharpe ──

    #[test]
    fn sharpe_constant_equity_is_zero() {
        assert_eq!(sharpe_ratio(&[10_000.0; 50]), 0.0);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        let mut eq = vec![10_000.0];
        for i in 1..100 {
            let r = if i % 2 == 0 { 1.002 } else { 1.0005 };
            eq.push(eq[i - 1] * r);
        }
        assert!(sharpe_ratio(&eq) > 5.0);
    }

    // ── Drawdown ──

    #[test]
    fn max_drawdown_known_path() {
        let eq = vec![100.0, 120.0, 90.0, 130.0, 117.0];
        assert!((max_drawdown(&eq) - (-0.25)).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_is_zero() {
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    // ── Trade metrics ──

    #[test]
    fn trade_metrics() {
        let trades = vec![
            make_trade(180.0, 100.0),
            make_trade(-100.0, 100.0),
            make_trade(180.0, 100.0),
            make_trade(-100.0, 100.0),
        ];
        assert_eq!(win_rate(&trades), 0.5);
        assert!((profit_factor(&trades) - 1.8).abs() < 1e-12);
        assert_eq!(avg_win(&trades), 180.0);
        assert_eq!(avg_loss(&trades), 100.0);
        assert!((avg_r(&trades) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_caps_without_losses() {
        assert_eq!(profit_factor(&[make_trade(50.0, 10.0)]), 100.0);
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn streaks() {
        let trades = vec![
            make_trade(1.0, 1.0),
            make_trade(1.0, 1.0),
            make_trade(-1.0, 1.0),
            make_trade(-1.0, 1.0),
            make_trade(-1.0, 1.0),
            make_trade(1.0, 1.0),
        ];
        assert_eq!(max_consecutive(&trades, true), 2);
        assert_eq!(max_consecutive(&trades, false), 3);
    }

    #[test]
    fn compute_on_empty_run() {
        let m = PerformanceMetrics::compute(&[10_000.0], &[], 10_000.0);
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.final_equity, 10_000.0);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.sharpe, 0.0);
    }
}
