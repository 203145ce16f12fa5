//! Feature-frame loading.
//!
//! A feature frame is one table holding bars for many symbols plus the
//! precomputed regime columns. Loading partitions it by symbol, validates
//! each partition into a `SymbolSeries` and isolates failures: a malformed
//! symbol is reported and skipped, the rest still load.
//!
//! Accepted layouts: `.csv` (header row, dates parsed by polars) and
//! `.parquet`. Column aliases: `time` for `timestamp`, `volatility_ratio`
//! for `vol_ratio`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use barrierlab_core::domain::{Bar, RegimeSnapshot};
use barrierlab_core::{SeriesError, SymbolSeries};

use crate::signals::FrameProbabilities;

/// Errors that abort loading the whole frame.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("unsupported feature frame format: {path} (expected .csv or .parquet)")]
    UnsupportedFormat { path: String },

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("column '{column}' has unsupported type {dtype}")]
    ColumnType { column: &'static str, dtype: String },

    #[error("feature frame is empty")]
    Empty,

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Why one symbol could not be loaded.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SymbolLoadError {
    #[error("row {row}: missing or unparseable timestamp")]
    InvalidTimestamp { row: usize },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// A symbol that failed to load.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: SymbolLoadError,
}

/// Options controlling how a frame is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Sort each symbol's rows by timestamp before validation. When false,
    /// unsorted input fails that symbol.
    pub sort: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { sort: true }
    }
}

/// Result of loading a feature frame.
#[derive(Debug, Clone)]
pub struct LoadedUniverse {
    /// Valid series in symbol order.
    pub series: Vec<SymbolSeries>,
    /// Present when the frame carried a `prob_long` column.
    pub probabilities: Option<FrameProbabilities>,
    pub failures: Vec<SymbolFailure>,
    /// BLAKE3 over every loaded symbol's rows, in symbol order.
    pub dataset_hash: String,
    /// Rows read from the frame.
    pub row_count: usize,
    /// Rows dropped because their symbol was null.
    pub dropped_rows: usize,
}

impl LoadedUniverse {
    pub fn symbols(&self) -> Vec<String> {
        self.series.iter().map(|s| s.symbol().to_string()).collect()
    }

    pub fn bar_count(&self) -> usize {
        self.series.iter().map(SymbolSeries::len).sum()
    }
}

/// Load a feature frame from a CSV or Parquet file.
pub fn load_feature_frame(path: &Path, options: &LoadOptions) -> Result<LoadedUniverse, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let df = match ext.as_deref() {
        Some("csv") => read_csv(path)?,
        Some("parquet") => read_parquet(path)?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.display().to_string(),
            })
        }
    };

    info!(path = %path.display(), rows = df.height(), "read feature frame");
    universe_from_frame(&df, options)
}

fn read_csv(path: &Path) -> Result<DataFrame, LoadError> {
    if !path.exists() {
        return Err(LoadError::Read {
            path: path.display().to_string(),
            reason: "file not found".into(),
        });
    }
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_try_parse_dates(true)
        .with_infer_schema_length(Some(10_000))
        .finish()?
        .collect()?;
    Ok(df)
}

fn read_parquet(path: &Path) -> Result<DataFrame, LoadError> {
    let file = fs::File::open(path).map_err(|e| LoadError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(ParquetReader::new(file).finish()?)
}

/// One parsed row before partitioning.
struct Row {
    index: usize,
    timestamp: Option<NaiveDateTime>,
    bar: [f64; 4],
    regime: RegimeSnapshot,
    prob_long: f64,
}

/// Partition an in-memory frame by symbol and validate each partition.
pub fn universe_from_frame(
    df: &DataFrame,
    options: &LoadOptions,
) -> Result<LoadedUniverse, LoadError> {
    if df.height() == 0 {
        return Err(LoadError::Empty);
    }

    let timestamps = timestamp_values(column(df, &["timestamp", "time"], "timestamp")?)?;
    let symbols = string_values(column(df, &["symbol"], "symbol")?)?;
    let open = f64_values(column(df, &["open"], "open")?)?;
    let high = f64_values(column(df, &["high"], "high")?)?;
    let low = f64_values(column(df, &["low"], "low")?)?;
    let close = f64_values(column(df, &["close"], "close")?)?;
    let atr = f64_values(column(df, &["atr"], "atr")?)?;
    let vol_ratio = f64_values(column(df, &["vol_ratio", "volatility_ratio"], "vol_ratio")?)?;
    let trend = f64_values(column(df, &["trend_strength"], "trend_strength")?)?;
    let prob_long = match df.column("prob_long") {
        Ok(col) => Some(f64_values(col)?),
        Err(_) => None,
    };

    let mut partitions: BTreeMap<String, Vec<Row>> = BTreeMap::new();
    let mut dropped_rows = 0;
    for (i, symbol) in symbols.into_iter().enumerate() {
        let Some(symbol) = symbol else {
            dropped_rows += 1;
            continue;
        };
        partitions.entry(symbol).or_default().push(Row {
            index: i,
            timestamp: timestamps[i],
            bar: [open[i], high[i], low[i], close[i]],
            regime: RegimeSnapshot::new(atr[i], vol_ratio[i], trend[i]),
            prob_long: prob_long.as_ref().map_or(f64::NAN, |p| p[i]),
        });
    }
    if dropped_rows > 0 {
        warn!(rows = dropped_rows, "dropped rows with null symbol");
    }

    let mut series = Vec::with_capacity(partitions.len());
    let mut probabilities = prob_long.as_ref().map(|_| FrameProbabilities::new());
    let mut failures = Vec::new();

    for (symbol, rows) in partitions {
        match build_series(&symbol, rows, options) {
            Ok((s, probs)) => {
                let insane = s.insane_bar_count();
                if insane > 0 {
                    warn!(symbol = %symbol, bars = insane, "bars with inconsistent OHLC ordering");
                }
                if let Some(p) = probabilities.as_mut() {
                    p.insert(symbol.clone(), probs);
                }
                series.push(s);
            }
            Err(error) => {
                warn!(symbol = %symbol, %error, "skipping symbol");
                failures.push(SymbolFailure { symbol, error });
            }
        }
    }

    let dataset_hash = compute_dataset_hash(&series, probabilities.as_ref());
    info!(
        symbols = series.len(),
        failed = failures.len(),
        hash = &dataset_hash[..12],
        "loaded feature frame"
    );

    Ok(LoadedUniverse {
        series,
        probabilities,
        failures,
        dataset_hash,
        row_count: df.height(),
        dropped_rows,
    })
}

fn build_series(
    symbol: &str,
    mut rows: Vec<Row>,
    options: &LoadOptions,
) -> Result<(SymbolSeries, Vec<f64>), SymbolLoadError> {
    if let Some(row) = rows.iter().find(|r| r.timestamp.is_none()) {
        return Err(SymbolLoadError::InvalidTimestamp { row: row.index });
    }
    if options.sort {
        rows.sort_by_key(|r| r.timestamp);
    }

    let mut bars = Vec::with_capacity(rows.len());
    let mut regimes = Vec::with_capacity(rows.len());
    let mut probs = Vec::with_capacity(rows.len());
    for row in rows {
        let [open, high, low, close] = row.bar;
        bars.push(Bar {
            symbol: symbol.to_string(),
            // Checked above.
            timestamp: row.timestamp.unwrap_or_default(),
            open,
            high,
            low,
            close,
        });
        regimes.push(row.regime);
        probs.push(row.prob_long);
    }

    Ok((SymbolSeries::new(symbol, bars, regimes)?, probs))
}

// ── Column extraction ───────────────────────────────────────────────

fn column<'a>(
    df: &'a DataFrame,
    names: &[&str],
    canonical: &'static str,
) -> Result<&'a Column, LoadError> {
    names
        .iter()
        .find_map(|name| df.column(name).ok())
        .ok_or(LoadError::MissingColumn(canonical))
}

/// Numeric column as f64; nulls become NaN.
fn f64_values(col: &Column) -> Result<Vec<f64>, LoadError> {
    let cast = col.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn string_values(col: &Column) -> Result<Vec<Option<String>>, LoadError> {
    let cast = col.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect())
}

fn timestamp_values(col: &Column) -> Result<Vec<Option<NaiveDateTime>>, LoadError> {
    match col.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            let millis = col
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&DataType::Int64)?;
            Ok(millis
                .i64()?
                .into_iter()
                .map(|v| v.and_then(DateTime::from_timestamp_millis).map(|dt| dt.naive_utc()))
                .collect())
        }
        DataType::String => Ok(col
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_timestamp))
            .collect()),
        other => Err(LoadError::ColumnType {
            column: "timestamp",
            dtype: other.to_string(),
        }),
    }
}

/// Parse RFC 3339, `%Y-%m-%d %H:%M:%S` (optional fraction, `T` separator)
/// or a bare `%Y-%m-%d` date.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Deterministic BLAKE3 hash over every loaded row.
///
/// Series are already in sorted symbol order, so the hash does not depend on
/// the row order of the source file when sorting is enabled.
fn compute_dataset_hash(series: &[SymbolSeries], probs: Option<&FrameProbabilities>) -> String {
    let mut hasher = blake3::Hasher::new();

    for s in series {
        hasher.update(s.symbol().as_bytes());
        for (bar, regime) in s.bars().iter().zip(s.regimes()) {
            hasher.update(&bar.timestamp.and_utc().timestamp_millis().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&regime.atr.to_le_bytes());
            hasher.update(&regime.volatility_ratio.to_le_bytes());
            hasher.update(&regime.trend_strength.to_le_bytes());
        }
        if let Some(p) = probs.and_then(|p| p.get(s.symbol())) {
            for v in p {
                hasher.update(&v.to_le_bytes());
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}
