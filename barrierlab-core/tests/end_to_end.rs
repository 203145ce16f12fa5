//! End-to-end label and signal scenarios through `BarrierEngine`.

use barrierlab_core::domain::{
    Bar, BarrierKind, Direction, HypothesisOutcome, Label, RegimeSnapshot, SkipReason,
};
use barrierlab_core::{BarLabel, BarrierConfig, BarrierEngine, SymbolSeries};
use chrono::{Duration, NaiveDate, NaiveDateTime};

// ── Helpers ──────────────────────────────────────────────────────────

fn day(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(i as i64)
}

/// Bars from (open, high, low, close) rows.
fn series(rows: &[(f64, f64, f64, f64)], regimes: Vec<RegimeSnapshot>) -> SymbolSeries {
    let bars = rows
        .iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            symbol: "EURUSD".into(),
            timestamp: day(i),
            open,
            high,
            low,
            close,
        })
        .collect();
    SymbolSeries::new("EURUSD", bars, regimes).unwrap()
}

fn normal_regime(atr: f64) -> RegimeSnapshot {
    RegimeSnapshot::new(atr, 1.0, 15.0)
}

fn engine() -> BarrierEngine {
    BarrierEngine::new(BarrierConfig::default()).unwrap()
}

// ── Labels ───────────────────────────────────────────────────────────

#[test]
fn long_take_profit_two_bars_out() {
    let rows = [
        (1.0990, 1.1005, 1.0985, 1.1000),
        (1.1000, 1.1030, 1.0990, 1.1020),
        (1.1020, 1.1095, 1.1010, 1.1080),
        (1.1080, 1.1085, 1.1040, 1.1050),
    ];
    let s = series(&rows, vec![normal_regime(0.0050); 4]);
    let label = engine().label_at(&s, 0);

    let detail = label.detail().expect("bar 0 is labelable");
    assert!((detail.levels.tp_long - 1.1090).abs() < 1e-12);
    assert!((detail.levels.sl_long - 1.0950).abs() < 1e-12);
    assert_eq!(
        detail.outcome.long,
        HypothesisOutcome::Hit {
            kind: BarrierKind::TakeProfit,
            offset: 2
        }
    );
    assert_eq!(label.label(), Label::Long);
}

#[test]
fn immediate_short_hit() {
    let rows = [
        (100.0, 100.5, 99.5, 100.0),
        (100.0, 100.4, 97.0, 97.5),
        (97.5, 98.0, 97.0, 97.8),
    ];
    let s = series(&rows, vec![normal_regime(1.0); 3]);
    let label = engine().label_at(&s, 0);
    assert_eq!(label.label(), Label::Short);
    let detail = label.detail().unwrap();
    assert_eq!(
        detail.outcome.short,
        HypothesisOutcome::Hit {
            kind: BarrierKind::TakeProfit,
            offset: 1
        }
    );
    assert_eq!(detail.outcome.bars_scanned, 1);
}

#[test]
fn wide_bar_resolves_neutral_by_tie_break() {
    // Both sides hit take-profit on the same bar.
    let rows = [(100.0, 100.5, 99.5, 100.0), (100.0, 105.0, 95.0, 100.0)];
    let s = series(&rows, vec![normal_regime(1.0); 2]);
    let detail = *engine().label_at(&s, 0).detail().unwrap();
    assert_eq!(
        detail.outcome.long,
        HypothesisOutcome::Hit {
            kind: BarrierKind::TakeProfit,
            offset: 1
        }
    );
    assert_eq!(detail.label, Label::Neutral);
}

#[test]
fn high_volatility_shortens_window() {
    // Target touched at offset 6. Normal regime (H=10) sees it, extreme
    // volatility (H=5) does not.
    let mut rows = vec![(100.0, 100.5, 99.5, 100.0); 6];
    rows.push((100.0, 102.5, 99.5, 102.0));
    let normal = series(&rows, vec![normal_regime(1.0); 7]);
    assert_eq!(engine().label_at(&normal, 0).label(), Label::Long);

    let extreme = series(&rows, vec![RegimeSnapshot::new(1.0, 1.6, 15.0); 7]);
    let label = engine().label_at(&extreme, 0);
    assert_eq!(label.detail().unwrap().params.horizon, 5);
    assert_eq!(label.label(), Label::Neutral);
}

#[test]
fn warmup_bars_are_skipped() {
    let rows = vec![(100.0, 100.5, 99.5, 100.0); 5];
    let mut regimes = vec![RegimeSnapshot::unavailable(); 2];
    regimes.extend(vec![normal_regime(1.0); 3]);
    let s = series(&rows, regimes);

    let labels = engine().label_series(&s);
    assert_eq!(labels[0], BarLabel::Skipped(SkipReason::AtrUnavailable));
    assert_eq!(labels[1], BarLabel::Skipped(SkipReason::AtrUnavailable));
    assert!(labels[2..].iter().all(|l| !l.is_skipped()));
    assert!(labels.iter().all(|l| l.label() == Label::Neutral));
}

#[test]
fn all_skipped_symbol_is_all_neutral() {
    let rows = vec![(100.0, 100.5, 99.5, 100.0); 8];
    let s = series(&rows, vec![RegimeSnapshot::new(0.0, 1.0, 1.0); 8]);
    let labels = engine().label_series(&s);
    assert_eq!(labels.iter().filter(|l| l.is_skipped()).count(), 8);
    assert!(labels.iter().all(|l| l.label() == Label::Neutral));
}

// ── Signals ──────────────────────────────────────────────────────────

#[test]
fn probabilities_map_to_directions() {
    let rows = [(1.0990, 1.1005, 1.0985, 1.1000)];
    let s = series(&rows, vec![normal_regime(0.0050)]);
    let engine = engine();

    let long = engine.signal_at(&s, 0, Some(0.82)).unwrap().unwrap();
    assert_eq!(long.direction, Direction::Long);
    assert!((long.confidence - 0.82).abs() < 1e-12);
    assert!((long.tp_price - 1.1090).abs() < 1e-12);
    assert!((long.sl_price - 1.0950).abs() < 1e-12);
    assert!((long.risk_reward_ratio - 1.8).abs() < 1e-12);

    let short = engine.signal_at(&s, 0, Some(0.25)).unwrap().unwrap();
    assert_eq!(short.direction, Direction::Short);
    assert!((short.confidence - 0.75).abs() < 1e-12);
    assert!((short.tp_price - 1.0910).abs() < 1e-12);
    assert!((short.sl_price - 1.1050).abs() < 1e-12);

    assert_eq!(engine.signal_at(&s, 0, Some(0.55)), Ok(None));
}

#[test]
fn zero_atr_suppresses_signal() {
    let rows = [(100.0, 100.5, 99.5, 100.0)];
    let s = series(&rows, vec![RegimeSnapshot::new(0.0, 1.0, 1.0)]);
    assert_eq!(
        engine().signal_at(&s, 0, Some(0.95)),
        Err(SkipReason::AtrNonPositive)
    );
}

#[test]
fn training_and_inference_agree_on_every_regime() {
    let regimes = [
        RegimeSnapshot::new(1.0, 1.0, 10.0),
        RegimeSnapshot::new(1.0, 0.6, 10.0),
        RegimeSnapshot::new(1.0, 1.3, 45.0),
        RegimeSnapshot::new(1.0, 1.7, 5.0),
    ];
    let engine = engine();
    for regime in regimes {
        let s = series(&[(100.0, 100.5, 99.5, 100.0); 2], vec![regime; 2]);
        let params = engine.label_at(&s, 0).detail().unwrap().params;
        let record = engine.signal_at(&s, 0, Some(0.99)).unwrap().unwrap();
        assert!((record.tp_price - (100.0 + params.tp_mult)).abs() < 1e-12);
        assert!((record.sl_price - (100.0 - params.sl_mult)).abs() < 1e-12);
        assert!((record.risk_reward_ratio - params.risk_reward_ratio()).abs() < 1e-12);
    }
}
