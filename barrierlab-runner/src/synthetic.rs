//! Synthetic feature frames for demos, smoke runs and tests.
//!
//! Each symbol gets a seeded random walk with volatility bursts, then the
//! same regime columns a real feature pipeline would provide: Wilder ATR,
//! ATR relative to its longer mean, and an efficiency-ratio trend score
//! scaled to 0..100. `prob_long` is a noisy look-ahead oracle, so signals
//! produced from it have a measurable (but imperfect) edge.
//!
//! Per-symbol RNGs are derived from the master seed with BLAKE3, so output
//! does not depend on symbol order.

use std::fs::File;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters of the synthetic generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub symbols: Vec<String>,
    /// Bars per symbol.
    pub bars: usize,
    pub seed: u64,
    pub start: NaiveDate,
    pub atr_period: usize,
    /// Window of the ATR mean used for `vol_ratio`.
    pub vol_window: usize,
    /// Window of the efficiency ratio used for `trend_strength`.
    pub trend_window: usize,
    /// Bars of look-ahead mixed into `prob_long`.
    pub oracle_lookahead: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["EURUSD".into(), "GBPUSD".into(), "USDJPY".into()],
            bars: 500,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            atr_period: 14,
            vol_window: 50,
            trend_window: 20,
            oracle_lookahead: 5,
        }
    }
}

/// Columns for one symbol.
#[derive(Debug, Clone, Default)]
struct SymbolColumns {
    timestamps: Vec<NaiveDateTime>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    atr: Vec<f64>,
    vol_ratio: Vec<f64>,
    trend_strength: Vec<f64>,
    prob_long: Vec<f64>,
}

/// Derive an order-independent RNG for one symbol.
fn symbol_rng(seed: u64, symbol: &str) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(bytes))
}

/// Standard normal draw (Box-Muller).
fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn generate_symbol(config: &SyntheticConfig, symbol: &str) -> SymbolColumns {
    let mut rng = symbol_rng(config.seed, symbol);
    let n = config.bars;
    let start = config.start.and_hms_opt(0, 0, 0).unwrap_or_default();

    let mut cols = SymbolColumns::default();
    let mut price = 1.0 + rng.gen::<f64>();
    let mut sigma = 0.006;
    let mut drift = 0.0;

    for i in 0..n {
        // Volatility bursts and slowly flipping drift give every regime
        // branch something to select.
        if rng.gen_bool(0.02) {
            sigma = 0.006 * (1.5 + 1.5 * rng.gen::<f64>());
        } else {
            sigma = 0.95 * sigma + 0.05 * 0.006;
        }
        if rng.gen_bool(0.01) {
            drift = 0.0015 * normal(&mut rng);
        }

        let open = price;
        let close = open * (1.0 + drift + sigma * normal(&mut rng));
        let wick = sigma * 0.5;
        let high = open.max(close) * (1.0 + wick * rng.gen::<f64>());
        let low = open.min(close) * (1.0 - wick * rng.gen::<f64>());

        cols.timestamps.push(start + Duration::days(i as i64));
        cols.open.push(open);
        cols.high.push(high);
        cols.low.push(low);
        cols.close.push(close);
        price = close;
    }

    let mut tr = true_range(&cols.high, &cols.low, &cols.close);
    if let Some(first) = tr.first_mut() {
        *first = f64::NAN;
    }
    cols.atr = wilder_smooth(&tr, config.atr_period);
    cols.vol_ratio = ratio_to_mean(&cols.atr, config.vol_window);
    cols.trend_strength = efficiency_ratio(&cols.close, config.trend_window)
        .into_iter()
        .map(|er| er * 100.0)
        .collect();
    cols.prob_long = oracle_probability(&cols.close, &cols.atr, config.oracle_lookahead, &mut rng);
    cols
}

/// Build a feature frame with one block of rows per symbol.
///
/// Columns: timestamp (`%Y-%m-%d %H:%M:%S` text), symbol, open, high, low,
/// close, atr, vol_ratio, trend_strength, prob_long. Warmup values are null.
pub fn synthetic_frame(config: &SyntheticConfig) -> PolarsResult<DataFrame> {
    let mut timestamps = Vec::new();
    let mut symbols = Vec::new();
    let mut open = Vec::new();
    let mut high = Vec::new();
    let mut low = Vec::new();
    let mut close = Vec::new();
    let mut atr = Vec::new();
    let mut vol_ratio = Vec::new();
    let mut trend = Vec::new();
    let mut prob = Vec::new();

    for symbol in &config.symbols {
        let cols = generate_symbol(config, symbol);
        timestamps.extend(
            cols.timestamps
                .iter()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        );
        symbols.extend(std::iter::repeat(symbol.clone()).take(cols.close.len()));
        open.extend(cols.open);
        high.extend(cols.high);
        low.extend(cols.low);
        close.extend(cols.close);
        atr.extend(cols.atr.into_iter().map(finite));
        vol_ratio.extend(cols.vol_ratio.into_iter().map(finite));
        trend.extend(cols.trend_strength.into_iter().map(finite));
        prob.extend(cols.prob_long.into_iter().map(finite));
    }

    DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps),
        Column::new("symbol".into(), symbols),
        Column::new("open".into(), open),
        Column::new("high".into(), high),
        Column::new("low".into(), low),
        Column::new("close".into(), close),
        Column::new("atr".into(), atr),
        Column::new("vol_ratio".into(), vol_ratio),
        Column::new("trend_strength".into(), trend),
        Column::new("prob_long".into(), prob),
    ])
}

/// Write a frame as CSV with a header row.
pub fn write_feature_csv(df: &mut DataFrame, path: &Path) -> PolarsResult<()> {
    let file = File::create(path)?;
    CsvWriter::new(file).include_header(true).finish(df)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

// ─── Indicators ─────────────────────────────────────────────────────

/// True range: max(high-low, |high-prev_close|, |low-prev_close|).
/// TR[0] is high-low (no previous close).
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }
    tr[0] = high[0] - low[0];
    for i in 1..n {
        let (h, l, pc) = (high[i], low[i], close[i - 1]);
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder smoothing (alpha = 1/period), seeded with the mean of the first
/// `period` values after any leading NaNs. A later NaN ends the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }
    let Some(seed_start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    let seed_end = seed_start + period;
    if seed_end > n || values[seed_start..seed_end].iter().any(|v| v.is_nan()) {
        return result;
    }

    let mut prev = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    let alpha = 1.0 / period as f64;
    for i in seed_end..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// Value divided by its trailing simple mean over `window` values.
pub fn ratio_to_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if window == 0 {
        return result;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        if mean > 0.0 {
            result[i] = values[i] / mean;
        }
    }
    result
}

/// Kaufman efficiency ratio: net move over path length, in [0, 1].
pub fn efficiency_ratio(close: &[f64], window: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; close.len()];
    if window == 0 {
        return result;
    }
    for i in window..close.len() {
        let net = (close[i] - close[i - window]).abs();
        let path: f64 = (i - window + 1..=i)
            .map(|j| (close[j] - close[j - 1]).abs())
            .sum();
        result[i] = if path > 0.0 { (net / path).min(1.0) } else { 0.0 };
    }
    result
}

/// Logistic of the forward move in ATR units plus noise. NaN where ATR is
/// unavailable; the last `lookahead` bars use whatever future is left.
fn oracle_probability(close: &[f64], atr: &[f64], lookahead: usize, rng: &mut StdRng) -> Vec<f64> {
    let n = close.len();
    (0..n)
        .map(|i| {
            let a = atr[i];
            if !(a.is_finite() && a > 0.0) {
                return f64::NAN;
            }
            let j = (i + lookahead).min(n - 1);
            let z = (close[j] - close[i]) / a + 1.5 * normal(rng);
            1.0 / (1.0 + (-z).exp())
        })
        .collect()
}
