//! Artifact export: label tables, signal files and run manifests.
//!
//! - **Labels**: CSV (`csv` crate) or Parquet (polars), one row per bar
//! - **Signals**: JSON with the config fingerprint that produced them
//! - **Manifest**: JSON describing a run (config, fingerprint, dataset hash,
//!   symbols, failures)
//!
//! JSON artifacts carry a `schema_version`; newer versions are rejected on
//! load. JSON writes are atomic (write to `.tmp`, rename into place).

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use barrierlab_core::domain::SignalRecord;
use barrierlab_core::{BarLabel, BarrierConfig, BarrierEngine};

use crate::data_loader::SymbolFailure;
use crate::labeling::{LabelStats, SymbolLabels};

/// Current schema version for persisted JSON artifacts.
pub const SCHEMA_VERSION: u32 = 1;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

fn io_err(path: &Path, e: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// On-disk format of the label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelFormat {
    Csv,
    Parquet,
}

impl LabelFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LabelFormat::Csv => "csv",
            LabelFormat::Parquet => "parquet",
        }
    }
}

impl FromStr for LabelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(LabelFormat::Csv),
            "parquet" => Ok(LabelFormat::Parquet),
            other => Err(format!("unknown label format '{other}' (expected csv or parquet)")),
        }
    }
}

impl fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ─── Label table ────────────────────────────────────────────────────

/// One row of the label table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRow {
    pub timestamp: String,
    pub symbol: String,
    pub label: i8,
    pub tp_mult: Option<f64>,
    pub sl_mult: Option<f64>,
    pub horizon: Option<usize>,
    /// `tp@N`, `sl@N` or `none`; empty for skipped bars.
    pub long_outcome: String,
    pub short_outcome: String,
    /// Empty for labeled bars.
    pub skip_reason: String,
}

impl LabelRow {
    fn new(symbol: &str, timestamp: NaiveDateTime, label: &BarLabel) -> Self {
        let detail = label.detail();
        Self {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            symbol: symbol.to_string(),
            label: label.label().as_i8(),
            tp_mult: detail.map(|d| d.params.tp_mult),
            sl_mult: detail.map(|d| d.params.sl_mult),
            horizon: detail.map(|d| d.params.horizon),
            long_outcome: detail.map(|d| d.outcome.long.to_string()).unwrap_or_default(),
            short_outcome: detail.map(|d| d.outcome.short.to_string()).unwrap_or_default(),
            skip_reason: label
                .skip_reason()
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Flatten per-symbol labels into table rows, symbol by symbol.
pub fn label_rows(labels: &[SymbolLabels]) -> Vec<LabelRow> {
    labels
        .iter()
        .flat_map(|sl| {
            sl.timestamps
                .iter()
                .zip(&sl.labels)
                .map(|(ts, label)| LabelRow::new(&sl.symbol, *ts, label))
        })
        .collect()
}

/// Write the label table in the requested format.
pub fn write_labels(
    labels: &[SymbolLabels],
    path: &Path,
    format: LabelFormat,
) -> Result<usize, ExportError> {
    let rows = label_rows(labels);
    match format {
        LabelFormat::Csv => write_labels_csv(&rows, path)?,
        LabelFormat::Parquet => write_labels_parquet(&rows, path)?,
    }
    Ok(rows.len())
}

pub fn write_labels_csv(rows: &[LabelRow], path: &Path) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| io_err(path, e))?;
    Ok(())
}

pub fn read_labels_csv(path: &Path) -> Result<Vec<LabelRow>, ExportError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let rows = rdr.deserialize().collect::<Result<Vec<LabelRow>, _>>()?;
    Ok(rows)
}

pub fn write_labels_parquet(rows: &[LabelRow], path: &Path) -> Result<(), ExportError> {
    let mut df = labels_to_dataframe(rows)?;
    let file = fs::File::create(path).map_err(|e| io_err(path, e))?;
    ParquetWriter::new(file).finish(&mut df)?;
    Ok(())
}

fn labels_to_dataframe(rows: &[LabelRow]) -> Result<DataFrame, ExportError> {
    let timestamps: Vec<&str> = rows.iter().map(|r| r.timestamp.as_str()).collect();
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    let labels: Vec<i32> = rows.iter().map(|r| i32::from(r.label)).collect();
    let tp: Vec<Option<f64>> = rows.iter().map(|r| r.tp_mult).collect();
    let sl: Vec<Option<f64>> = rows.iter().map(|r| r.sl_mult).collect();
    let horizon: Vec<Option<u32>> = rows
        .iter()
        .map(|r| r.horizon.map(|h| h as u32))
        .collect();
    let long: Vec<&str> = rows.iter().map(|r| r.long_outcome.as_str()).collect();
    let short: Vec<&str> = rows.iter().map(|r| r.short_outcome.as_str()).collect();
    let skip: Vec<&str> = rows.iter().map(|r| r.skip_reason.as_str()).collect();

    let df = DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps),
        Column::new("symbol".into(), symbols),
        Column::new("label".into(), labels),
        Column::new("tp_mult".into(), tp),
        Column::new("sl_mult".into(), sl),
        Column::new("horizon".into(), horizon),
        Column::new("long_outcome".into(), long),
        Column::new("short_outcome".into(), short),
        Column::new("skip_reason".into(), skip),
    ])?;
    Ok(df)
}

// ─── Signals ────────────────────────────────────────────────────────

/// Signals plus the fingerprint of the configuration that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_fingerprint: String,
    pub generated_at: NaiveDateTime,
    pub signals: Vec<SignalRecord>,
}

impl SignalFile {
    pub fn new(engine: &BarrierEngine, signals: Vec<SignalRecord>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config_fingerprint: engine.fingerprint().to_string(),
            generated_at: chrono::Utc::now().naive_utc(),
            signals,
        }
    }
}

pub fn write_signals(file: &SignalFile, path: &Path) -> Result<(), ExportError> {
    write_json_atomic(file, path)
}

pub fn read_signals(path: &Path) -> Result<SignalFile, ExportError> {
    let content = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let file: SignalFile = serde_json::from_str(&content)?;
    check_schema(file.schema_version)?;
    Ok(file)
}

// ─── Manifest ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    Labels,
    Signals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFailure {
    pub symbol: String,
    pub reason: String,
}

/// Record of one run, written next to its artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub kind: ManifestKind,
    pub config_fingerprint: String,
    pub dataset_hash: String,
    pub config: BarrierConfig,
    pub created_at: NaiveDateTime,
    pub symbols: Vec<String>,
    pub failures: Vec<ManifestFailure>,
    /// Overall label distribution, for label runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_stats: Option<LabelStats>,
    /// Artifact file names relative to the manifest.
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl RunManifest {
    pub fn new(
        kind: ManifestKind,
        engine: &BarrierEngine,
        dataset_hash: &str,
        symbols: Vec<String>,
        failures: &[SymbolFailure],
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            kind,
            config_fingerprint: engine.fingerprint().to_string(),
            dataset_hash: dataset_hash.to_string(),
            config: engine.config().clone(),
            created_at: chrono::Utc::now().naive_utc(),
            symbols,
            failures: failures
                .iter()
                .map(|f| ManifestFailure {
                    symbol: f.symbol.clone(),
                    reason: f.error.to_string(),
                })
                .collect(),
            label_stats: None,
            artifacts: Vec::new(),
        }
    }

    /// True when this manifest was produced with the engine's configuration.
    pub fn matches(&self, engine: &BarrierEngine) -> bool {
        self.config_fingerprint == engine.fingerprint().as_str()
    }
}

pub fn write_manifest(manifest: &RunManifest, path: &Path) -> Result<(), ExportError> {
    write_json_atomic(manifest, path)
}

pub fn read_manifest(path: &Path) -> Result<RunManifest, ExportError> {
    let content = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let manifest: RunManifest = serde_json::from_str(&content)?;
    check_schema(manifest.schema_version)?;
    Ok(manifest)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn check_schema(found: u32) -> Result<(), ExportError> {
    if found > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json).map_err(|e| io_err(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(path, e)
    })
}
