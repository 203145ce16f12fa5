//! BarrierLab Core: triple-barrier labels and signal decisions.
//!
//! This crate contains the pure engine:
//! - Domain types (bars, regime snapshots, hypothesis outcomes, labels, signals)
//! - Regime-aware barrier parameter selection
//! - Forward scanner with one state machine per hypothesis
//! - Label resolver and signal decision engine
//! - `BarrierEngine`, the single configuration shared by labels and signals
//!
//! Nothing here does I/O beyond reading a config file; batch orchestration
//! lives in `barrierlab-runner`.

pub mod barrier;
pub mod config;
pub mod decision;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod resolve;
pub mod scan;
pub mod series;

pub use barrier::{select_parameters, BarrierLevels, BarrierParams};
pub use config::{BarrierConfig, ConfigError, RegimeTable};
pub use decision::decide;
pub use engine::{BarLabel, BarrierEngine, LabelDetail};
pub use fingerprint::ConfigFingerprint;
pub use resolve::resolve;
pub use scan::{scan, ScanOutcome};
pub use series::{SeriesError, SymbolSeries};
