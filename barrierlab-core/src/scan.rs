//! Forward scanner: first-touch detection for the long and short hypotheses.
//!
//! Both hypotheses open at the entry bar's close and are scanned over the same
//! window, `entry_index + 1 ..= min(entry_index + horizon, last_index)`, in
//! time order. Each one is a two-state machine (pending → resolved) and the
//! pass stops as soon as both are resolved.
//!
//! Same-bar ambiguity: when one future bar touches both barriers of a
//! hypothesis, take-profit is checked first and wins. Intrabar order is not
//! observed on OHLC data, so this biases labels optimistically.

use serde::{Deserialize, Serialize};

use crate::barrier::BarrierLevels;
use crate::domain::{Bar, BarrierKind, HypothesisOutcome, Side};

/// Outcomes of both hypotheses for one entry bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub long: HypothesisOutcome,
    pub short: HypothesisOutcome,
    /// Number of future bars inspected before the early exit or window end.
    pub bars_scanned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HypothesisState {
    Pending,
    Resolved(BarrierKind, usize),
}

/// Tracks one hypothesis through the window.
#[derive(Debug, Clone, Copy)]
struct Hypothesis {
    side: Side,
    take_profit: f64,
    stop_loss: f64,
    state: HypothesisState,
}

impl Hypothesis {
    fn new(side: Side, take_profit: f64, stop_loss: f64) -> Self {
        Self {
            side,
            take_profit,
            stop_loss,
            state: HypothesisState::Pending,
        }
    }

    fn is_pending(&self) -> bool {
        self.state == HypothesisState::Pending
    }

    /// Advance the state machine with one future bar.
    fn observe(&mut self, bar: &Bar, offset: usize) {
        if !self.is_pending() {
            return;
        }
        let (tp_touched, sl_touched) = match self.side {
            Side::Long => (bar.high >= self.take_profit, bar.low <= self.stop_loss),
            Side::Short => (bar.low <= self.take_profit, bar.high >= self.stop_loss),
        };
        // Take-profit is checked first.
        if tp_touched {
            self.state = HypothesisState::Resolved(BarrierKind::TakeProfit, offset);
        } else if sl_touched {
            self.state = HypothesisState::Resolved(BarrierKind::StopLoss, offset);
        }
    }

    fn outcome(&self) -> HypothesisOutcome {
        match self.state {
            HypothesisState::Pending => HypothesisOutcome::NoHit,
            HypothesisState::Resolved(kind, offset) => HypothesisOutcome::Hit { kind, offset },
        }
    }
}

/// Scan the bars after `entry_index` for the first barrier touch of each side.
///
/// `bars` must be sorted ascending by time. An entry at the last bar (or past
/// the end) has an empty window and yields `NoHit` for both sides. NaN highs
/// or lows never touch a barrier.
pub fn scan(
    bars: &[Bar],
    entry_index: usize,
    levels: &BarrierLevels,
    horizon: usize,
) -> ScanOutcome {
    let mut long = Hypothesis::new(Side::Long, levels.tp_long, levels.sl_long);
    let mut short = Hypothesis::new(Side::Short, levels.tp_short, levels.sl_short);

    let start = entry_index.saturating_add(1);
    let end = entry_index
        .saturating_add(horizon)
        .min(bars.len().saturating_sub(1));

    let mut bars_scanned = 0;
    if start <= end {
        for (j, bar) in bars[start..=end].iter().enumerate() {
            let offset = j + 1;
            long.observe(bar, offset);
            short.observe(bar, offset);
            bars_scanned = offset;
            if !long.is_pending() && !short.is_pending() {
                break;
            }
        }
    }

    ScanOutcome {
        long: long.outcome(),
        short: short.outcome(),
        bars_scanned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Bars from (high, low) pairs; open/close at the midpoint.
    fn bars(hl: &[(f64, f64)]) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        hl.iter()
            .enumerate()
            .map(|(i, &(high, low))| {
                let mid = (high + low) / 2.0;
                Bar {
                    symbol: "TEST".into(),
                    timestamp: base + chrono::Duration::days(i as i64),
                    open: mid,
                    high,
                    low,
                    close: mid,
                }
            })
            .collect()
    }

    // entry 100, atr 1, tp 2, sl 1 → tp_long 102, sl_long 99, tp_short 98, sl_short 101
    fn levels() -> BarrierLevels {
        BarrierLevels::new(100.0, 1.0, 2.0, 1.0)
    }

    fn tp(offset: usize) -> HypothesisOutcome {
        HypothesisOutcome::Hit {
            kind: BarrierKind::TakeProfit,
            offset,
        }
    }

    fn sl(offset: usize) -> HypothesisOutcome {
        HypothesisOutcome::Hit {
            kind: BarrierKind::StopLoss,
            offset,
        }
    }

    #[test]
    fn flat_series_never_hits() {
        let b = bars(&[(100.5, 99.5); 20]);
        let out = scan(&b, 0, &levels(), 10);
        assert_eq!(out.long, HypothesisOutcome::NoHit);
        assert_eq!(out.short, HypothesisOutcome::NoHit);
        assert_eq!(out.bars_scanned, 10);
    }

    #[test]
    fn entry_bar_is_never_scanned() {
        // Entry bar itself spans every barrier; the rest are flat.
        let mut hl = vec![(110.0, 90.0)];
        hl.extend(std::iter::repeat((100.5, 99.5)).take(5));
        let out = scan(&bars(&hl), 0, &levels(), 5);
        assert_eq!(out.long, HypothesisOutcome::NoHit);
        assert_eq!(out.short, HypothesisOutcome::NoHit);
    }

    #[test]
    fn window_stops_at_horizon() {
        // Barrier touched at offset 4, horizon 3 → no hit.
        let b = bars(&[
            (100.5, 99.5),
            (100.5, 99.5),
            (100.5, 99.5),
            (100.5, 99.5),
            (103.0, 99.5),
        ]);
        let out = scan(&b, 0, &levels(), 3);
        assert_eq!(out.long, HypothesisOutcome::NoHit);
        assert_eq!(out.bars_scanned, 3);

        let out = scan(&b, 0, &levels(), 4);
        assert_eq!(out.long, tp(4));
    }

    #[test]
    fn window_stops_at_series_end() {
        let b = bars(&[(100.5, 99.5), (100.5, 99.5), (100.5, 99.5)]);
        let out = scan(&b, 0, &levels(), 10);
        assert_eq!(out.bars_scanned, 2);
        assert_eq!(out.long, HypothesisOutcome::NoHit);
    }

    #[test]
    fn last_bar_has_empty_window() {
        let b = bars(&[(100.5, 99.5), (100.5, 99.5)]);
        let out = scan(&b, 1, &levels(), 10);
        assert_eq!(out.bars_scanned, 0);
        assert_eq!(out.long, HypothesisOutcome::NoHit);
        assert_eq!(out.short, HypothesisOutcome::NoHit);

        let out = scan(&b, 5, &levels(), 10);
        assert_eq!(out.bars_scanned, 0);
    }

    #[test]
    fn zero_horizon_scans_nothing() {
        let b = bars(&[(100.5, 99.5), (110.0, 90.0)]);
        let out = scan(&b, 0, &levels(), 0);
        assert_eq!(out.bars_scanned, 0);
        assert_eq!(out.long, HypothesisOutcome::NoHit);
    }

    #[test]
    fn immediate_long_hit() {
        // Offset 1: high reaches tp_long, low stays above sl_long.
        // The same high also reaches sl_short.
        let b = bars(&[(100.5, 99.5), (102.5, 99.5)]);
        let out = scan(&b, 0, &levels(), 5);
        assert_eq!(out.long, tp(1));
        assert_eq!(out.short, sl(1));
        assert_eq!(out.bars_scanned, 1);
    }

    #[test]
    fn same_bar_tie_break_favors_take_profit() {
        // One wide bar touches all four barriers.
        let b = bars(&[(100.5, 99.5), (105.0, 95.0)]);
        let out = scan(&b, 0, &levels(), 5);
        assert_eq!(out.long, tp(1));
        assert_eq!(out.short, tp(1));
    }

    #[test]
    fn barrier_touch_is_inclusive() {
        let b = bars(&[(100.5, 99.5), (102.0, 99.5)]);
        assert_eq!(scan(&b, 0, &levels(), 5).long, tp(1));

        let b = bars(&[(100.5, 99.5), (100.5, 99.0)]);
        let out = scan(&b, 0, &levels(), 5);
        assert_eq!(out.long, sl(1));
    }

    #[test]
    fn hypotheses_resolve_independently() {
        let b = bars(&[
            (100.5, 99.5),
            (100.5, 98.5), // long SL (99), short still pending (tp 98)
            (100.5, 99.5),
            (100.5, 97.5), // short TP
        ]);
        let out = scan(&b, 0, &levels(), 10);
        assert_eq!(out.long, sl(1));
        assert_eq!(out.short, tp(3));
        assert_eq!(out.bars_scanned, 3);
    }

    #[test]
    fn early_exit_once_both_resolved() {
        let b = bars(&[
            (100.5, 99.5),
            (101.5, 99.5), // short SL
            (102.5, 99.5), // long TP
            (100.5, 99.5),
            (100.5, 99.5),
        ]);
        let out = scan(&b, 0, &levels(), 10);
        assert_eq!(out.short, sl(1));
        assert_eq!(out.long, tp(2));
        assert_eq!(out.bars_scanned, 2);
    }

    #[test]
    fn resolved_hypothesis_ignores_later_bars() {
        let b = bars(&[(100.5, 99.5), (100.5, 98.9), (105.0, 99.5)]);
        let out = scan(&b, 0, &levels(), 10);
        assert_eq!(out.long, sl(1));
    }

    #[test]
    fn nan_prices_never_touch() {
        let b = bars(&[(100.5, 99.5), (f64::NAN, f64::NAN), (100.5, 99.5)]);
        let out = scan(&b, 0, &levels(), 10);
        assert_eq!(out.long, HypothesisOutcome::NoHit);
        assert_eq!(out.short, HypothesisOutcome::NoHit);
    }

    #[test]
    fn scan_from_middle_of_series() {
        let b = bars(&[
            (110.0, 90.0),
            (110.0, 90.0),
            (100.5, 99.5), // entry at index 2
            (100.5, 99.5),
            (102.2, 99.8),
        ]);
        let out = scan(&b, 2, &levels(), 10);
        assert_eq!(out.long, tp(2));
        assert_eq!(out.short, sl(2));
    }
}
