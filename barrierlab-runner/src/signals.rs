//! Batch signal generation, reporting and summaries.
//!
//! The classifier that produces long-win probabilities is an external
//! collaborator behind the `ProbabilitySource` trait. `FrameProbabilities`
//! serves precomputed probabilities from the feature frame's `prob_long`
//! column.

use std::collections::BTreeMap;
use chrono::TimeDelta;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use barrierlab_core::domain::{Direction, SignalRecord, SkipReason};
use barrierlab_core::{BarrierEngine, SymbolSeries};

/// Supplies the model's long-win probability for a bar.
pub trait ProbabilitySource: Sync {
    /// `None` when no estimate exists for the bar.
    fn prob_long(&self, series: &SymbolSeries, index: usize) -> Option<f64>;
}

/// Probabilities read from a feature frame, keyed by symbol and aligned with
/// that symbol's bars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameProbabilities {
    by_symbol: BTreeMap<String, Vec<f64>>,
}

impl FrameProbabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, probabilities: Vec<f64>) {
        self.by_symbol.insert(symbol.into(), probabilities);
    }

    pub fn get(&self, symbol: &str) -> Option<&[f64]> {
        self.by_symbol.get(symbol).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

impl ProbabilitySource for FrameProbabilities {
    fn prob_long(&self, series: &SymbolSeries, index: usize) -> Option<f64> {
        let p = *self.by_symbol.get(series.symbol())?.get(index)?;
        // Nulls arrive as NaN.
        (!p.is_nan()).then_some(p)
    }
}

/// Which bars to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalScope {
    /// Only the most recent bar per symbol (live run).
    Latest,
    /// Every bar (history analysis and evaluation).
    History,
}

/// Per-symbol counts for one signal run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolSignalSummary {
    pub symbol: String,
    /// Bars scored.
    pub evaluated: usize,
    /// LONG or SHORT decisions.
    pub emitted: usize,
    /// NONE decisions.
    pub neutral: usize,
    /// Bars that could not be scored.
    pub skipped: usize,
    pub skip_reasons: BTreeMap<String, usize>,
}

/// Output of `generate_signals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalRun {
    /// Emitted signals ordered by (timestamp, symbol).
    pub signals: Vec<SignalRecord>,
    pub summaries: Vec<SymbolSignalSummary>,
}

impl SignalRun {
    pub fn skipped(&self) -> usize {
        self.summaries.iter().map(|s| s.skipped).sum()
    }

    pub fn evaluated(&self) -> usize {
        self.summaries.iter().map(|s| s.evaluated).sum()
    }
}

/// Score bars of every symbol in parallel.
pub fn generate_signals<S>(
    engine: &BarrierEngine,
    series: &[SymbolSeries],
    source: &S,
    scope: SignalScope,
) -> SignalRun
where
    S: ProbabilitySource + ?Sized,
{
    let per_symbol: Vec<(Vec<SignalRecord>, SymbolSignalSummary)> = series
        .par_iter()
        .map(|s| signals_for_symbol(engine, s, source, scope))
        .collect();

    let mut run = SignalRun::default();
    for (signals, summary) in per_symbol {
        run.signals.extend(signals);
        run.summaries.push(summary);
    }
    run.signals
        .sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.symbol.cmp(&b.symbol)));

    info!(
        symbols = run.summaries.len(),
        evaluated = run.evaluated(),
        emitted = run.signals.len(),
        skipped = run.skipped(),
        "signal generation complete"
    );
    run
}

fn signals_for_symbol<S>(
    engine: &BarrierEngine,
    series: &SymbolSeries,
    source: &S,
    scope: SignalScope,
) -> (Vec<SignalRecord>, SymbolSignalSummary)
where
    S: ProbabilitySource + ?Sized,
{
    let indices = match scope {
        SignalScope::Latest => series.last_index()..series.len(),
        SignalScope::History => 0..series.len(),
    };

    let mut summary = SymbolSignalSummary {
        symbol: series.symbol().to_string(),
        ..Default::default()
    };
    let mut signals = Vec::new();

    for index in indices {
        summary.evaluated += 1;
        match engine.signal_at(series, index, source.prob_long(series, index)) {
            Ok(Some(record)) => {
                summary.emitted += 1;
                signals.push(record);
            }
            Ok(None) => summary.neutral += 1,
            Err(reason) => record_skip(&mut summary, reason),
        }
    }

    debug!(
        symbol = %summary.symbol,
        evaluated = summary.evaluated,
        emitted = summary.emitted,
        skipped = summary.skipped,
        "scored symbol"
    );
    (signals, summary)
}

fn record_skip(summary: &mut SymbolSignalSummary, reason: SkipReason) {
    summary.skipped += 1;
    *summary
        .skip_reasons
        .entry(reason.as_str().to_string())
        .or_insert(0) += 1;
}

/// Signals within `days` of the most recent signal.
///
/// A negative `days` is treated as zero. A window reaching past the
/// earliest representable timestamp keeps every signal.
pub fn history_window(signals: &[SignalRecord], days: i64) -> Vec<SignalRecord> {
    let Some(latest) = signals.iter().map(|s| s.timestamp).max() else {
        return Vec::new();
    };
    let cutoff = TimeDelta::try_days(days.max(0)).and_then(|d| latest.checked_sub_signed(d));
    match cutoff {
        Some(cutoff) => signals
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .cloned()
            .collect(),
        None => signals.to_vec(),
    }
}

// ─── Report ─────────────────────────────────────────────────────────

/// Human-readable report of emitted signals.
pub fn format_signals_report(signals: &[SignalRecord]) -> String {
    if signals.is_empty() {
        return "No signals generated.".to_string();
    }

    let rule = "=".repeat(80);
    let longs = count_direction(signals, Direction::Long);
    let shorts = count_direction(signals, Direction::Short);

    let mut out = String::with_capacity(256 + signals.len() * 256);
    out.push_str(&format!("{rule}\nTRADING SIGNALS REPORT\n{rule}\n\n"));
    out.push_str(&format!("Total Signals: {}\n", signals.len()));
    out.push_str(&format!("  Long:  {longs}\n"));
    out.push_str(&format!("  Short: {shorts}\n\n"));

    for (i, s) in signals.iter().enumerate() {
        out.push_str(&format!("{}. {} - {}\n", i + 1, s.symbol, s.direction));
        out.push_str(&format!("   Timestamp:   {}\n", s.timestamp));
        out.push_str(&format!("   Confidence:  {:.1}%\n", s.confidence * 100.0));
        out.push_str(&format!("   Entry:       {:.5}\n", s.entry_price));
        out.push_str(&format!("   Take Profit: {:.5}\n", s.tp_price));
        out.push_str(&format!("   Stop Loss:   {:.5}\n", s.sl_price));
        out.push_str(&format!("   R:R Ratio:   1:{:.1}\n\n", s.risk_reward_ratio));
    }

    out.push_str(&format!("{rule}\n"));
    out.push_str("Signals are research output, not trading advice.\n");
    out.push_str(&rule);
    out
}

fn count_direction(signals: &[SignalRecord], direction: Direction) -> usize {
    signals.iter().filter(|s| s.direction == direction).count()
}

// ─── Summary ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionCounts {
    pub long: usize,
    pub short: usize,
}

/// Aggregate statistics over a set of signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub total: usize,
    pub long: usize,
    pub short: usize,
    /// Mean confidence; 0.0 for an empty set.
    pub avg_confidence: f64,
    pub by_symbol: BTreeMap<String, DirectionCounts>,
}

pub fn summarize_signals(signals: &[SignalRecord]) -> SignalSummary {
    let mut summary = SignalSummary {
        total: signals.len(),
        ..Default::default()
    };
    for s in signals {
        let counts = summary.by_symbol.entry(s.symbol.clone()).or_default();
        match s.direction {
            Direction::Long => {
                summary.long += 1;
                counts.long += 1;
            }
            Direction::Short => {
                summary.short += 1;
                counts.short += 1;
            }
            Direction::None => {}
        }
    }
    if !signals.is_empty() {
        summary.avg_confidence =
            signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrierlab_core::domain::{Bar, RegimeSnapshot};
    use barrierlab_core::BarrierConfig;
    use chrono::{NaiveDate, NaiveDateTime};

    struct Constant(f64);

    impl ProbabilitySource for Constant {
        fn prob_long(&self, _series: &SymbolSeries, _index: usize) -> Option<f64> {
            Some(self.0)
        }
    }

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series(symbol: &str, n: usize, regime: RegimeSnapshot) -> SymbolSeries {
        let bars = (0..n)
            .map(|i| Bar {
                symbol: symbol.into(),
                timestamp: ts(i as u32 + 1),
                open: 100.0,
                high: 100.5,
                low: 99.5,
                close: 100.0,
            })
            .collect();
        SymbolSeries::new(symbol, bars, vec![regime; n]).unwrap()
    }

    fn engine() -> BarrierEngine {
        BarrierEngine::new(BarrierConfig::default()).unwrap()
    }

    fn record(symbol: &str, day: u32, direction: Direction, confidence: f64) -> SignalRecord {
        SignalRecord {
            timestamp: ts(day),
            symbol: symbol.into(),
            direction,
            confidence,
            prob_long: confidence,
            entry_price: 1.1,
            tp_price: 1.109,
            sl_price: 1.095,
            atr: 0.005,
            risk_reward_ratio: 1.8,
        }
    }

    #[test]
    fn latest_scope_scores_one_bar_per_symbol() {
        let universe = vec![
            series("EURUSD", 5, RegimeSnapshot::new(1.0, 1.0, 1.0)),
            series("GBPUSD", 3, RegimeSnapshot::new(1.0, 1.0, 1.0)),
        ];
        let run = generate_signals(&engine(), &universe, &Constant(0.9), SignalScope::Latest);
        assert_eq!(run.signals.len(), 2);
        assert_eq!(run.evaluated(), 2);
        assert_eq!(run.signals[0].timestamp, ts(3));
        assert_eq!(run.signals[1].timestamp, ts(5));
    }

    #[test]
    fn history_scope_scores_every_bar() {
        let universe = vec![series("EURUSD", 6, RegimeSnapshot::new(1.0, 1.0, 1.0))];
        let run = generate_signals(&engine(), &universe, &Constant(0.1), SignalScope::History);
        assert_eq!(run.signals.len(), 6);
        assert!(run.signals.iter().all(|s| s.direction == Direction::Short));
        assert!(run
            .signals
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn skips_and_neutral_decisions_are_counted() {
        let universe = vec![
            series("EURUSD", 4, RegimeSnapshot::new(0.0, 1.0, 1.0)),
            series("GBPUSD", 4, RegimeSnapshot::new(1.0, 1.0, 1.0)),
        ];
        let run = generate_signals(&engine(), &universe, &Constant(0.5), SignalScope::History);
        assert!(run.signals.is_empty());

        let eur = &run.summaries[0];
        assert_eq!(eur.skipped, 4);
        assert_eq!(eur.skip_reasons.get("atr_non_positive"), Some(&4));
        let gbp = &run.summaries[1];
        assert_eq!(gbp.neutral, 4);
        assert_eq!(gbp.skipped, 0);
    }

    #[test]
    fn frame_probabilities_treat_nan_as_missing() {
        let s = series("EURUSD", 3, RegimeSnapshot::new(1.0, 1.0, 1.0));
        let mut probs = FrameProbabilities::new();
        probs.insert("EURUSD", vec![0.9, f64::NAN]);
        assert_eq!(probs.prob_long(&s, 0), Some(0.9));
        assert_eq!(probs.prob_long(&s, 1), None);
        assert_eq!(probs.prob_long(&s, 2), None);

        let other = series("USDJPY", 1, RegimeSnapshot::new(1.0, 1.0, 1.0));
        assert_eq!(probs.prob_long(&other, 0), None);
    }

    #[test]
    fn missing_probabilities_skip_bars() {
        let universe = vec![series("EURUSD", 3, RegimeSnapshot::new(1.0, 1.0, 1.0))];
        let run = generate_signals(
            &engine(),
            &universe,
            &FrameProbabilities::new(),
            SignalScope::History,
        );
        assert_eq!(run.summaries[0].skipped, 3);
        assert_eq!(
            run.summaries[0].skip_reasons.get("probability_unavailable"),
            Some(&3)
        );
    }

    #[test]
    fn report_lists_every_signal() {
        let signals = vec![
            record("EURUSD", 1, Direction::Long, 0.82),
            record("GBPUSD", 1, Direction::Short, 0.75),
        ];
        let report = format_signals_report(&signals);
        assert!(report.contains("Total Signals: 2"));
        assert!(report.contains("  Long:  1"));
        assert!(report.contains("  Short: 1"));
        assert!(report.contains("1. EURUSD - LONG"));
        assert!(report.contains("2. GBPUSD - SHORT"));
        assert!(report.contains("Confidence:  82.0%"));
        assert!(report.contains("Entry:       1.10000"));
        assert!(report.contains("R:R Ratio:   1:1.8"));
    }

    #[test]
    fn empty_report() {
        assert_eq!(format_signals_report(&[]), "No signals generated.");
    }

    #[test]
    fn summary_counts_by_symbol() {
        let signals = vec![
            record("EURUSD", 1, Direction::Long, 0.8),
            record("EURUSD", 2, Direction::Short, 0.9),
            record("GBPUSD", 2, Direction::Long, 0.7),
        ];
        let summary = summarize_signals(&signals);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.long, 2);
        assert_eq!(summary.short, 1);
        assert!((summary.avg_confidence - 0.8).abs() < 1e-12);
        assert_eq!(summary.by_symbol["EURUSD"], DirectionCounts { long: 1, short: 1 });
        assert_eq!(summary.by_symbol["GBPUSD"], DirectionCounts { long: 1, short: 0 });

        assert_eq!(summarize_signals(&[]), SignalSummary::default());
    }

    #[test]
    fn history_window_keeps_recent_days() {
        let signals = vec![
            record("EURUSD", 1, Direction::Long, 0.8),
            record("EURUSD", 10, Direction::Long, 0.8),
            record("EURUSD", 20, Direction::Short, 0.8),
        ];
        let recent = history_window(&signals, 10);
        assert_eq!(recent.len(), 2);
        assert!(history_window(&[], 30).is_empty());
    }

    #[test]
    fn history_window_without_lower_bound_keeps_everything() {
        let signals = vec![
            record("EURUSD", 1, Direction::Long, 0.8),
            record("GBPUSD", 15, Direction::Short, 0.8),
        ];
        assert_eq!(history_window(&signals, 1_000_000_000), signals);
        assert_eq!(history_window(&signals, i64::MAX), signals);
    }

    #[test]
    fn history_window_negative_days_keeps_latest_bar_only() {
        let signals = vec![
            record("EURUSD", 1, Direction::Long, 0.8),
            record("EURUSD", 15, Direction::Long, 0.8),
            record("GBPUSD", 15, Direction::Short, 0.8),
        ];
        let recent = history_window(&signals, -5);
        assert_eq!(recent, history_window(&signals, 0));
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|s| s.timestamp == ts(15)));
    }

    #[test]
    fn report_layout_is_stable() {
        let report = format_signals_report(&[record("EURUSD", 3, Direction::Long, 0.8)]);
        let rule = "=".repeat(80);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], rule);
        assert_eq!(lines[1], "TRADING SIGNALS REPORT");
        assert_eq!(lines[3], "");
        assert_eq!(lines[7], "");
        assert_eq!(lines[8], "1. EURUSD - LONG");
        assert_eq!(lines[9], "   Timestamp:   2024-05-03 00:00:00");
        assert_eq!(lines[15], "");
        assert_eq!(*lines.last().unwrap(), rule);
        assert!(!report.ends_with('\n'));
    }
}
