//! BarrierLab Runner: batch labeling, signal generation and evaluation.
//!
//! This crate builds on `barrierlab-core` to provide:
//! - Feature-frame loading (CSV/Parquet via polars) with per-symbol failure isolation
//! - Parallel labeling across symbols with label distribution stats
//! - Signal generation from a pluggable probability source, reports and summaries
//! - Label-outcome evaluation with performance metrics and a threshold sweep
//! - Label/signal/manifest export with schema versioning
//! - Synthetic feature frames for demos and tests

pub mod data_loader;
pub mod evaluate;
pub mod export;
pub mod labeling;
pub mod metrics;
pub mod signals;
pub mod sweep;
pub mod synthetic;

pub use data_loader::{
    load_feature_frame, universe_from_frame, LoadError, LoadOptions, LoadedUniverse,
    SymbolFailure, SymbolLoadError,
};
pub use evaluate::{
    evaluate_signals, EvaluateError, Evaluation, EvaluationConfig, SymbolPerformance, Trade,
};
pub use export::{
    read_labels_csv, read_manifest, read_signals, write_labels, write_manifest, write_signals,
    ExportError, LabelFormat, LabelRow, ManifestKind, RunManifest, SignalFile, SCHEMA_VERSION,
};
pub use labeling::{label_symbol, label_universe, overall_stats, LabelStats, SymbolLabels};
pub use metrics::PerformanceMetrics;
pub use signals::{
    format_signals_report, generate_signals, history_window, summarize_signals,
    FrameProbabilities, ProbabilitySource, SignalRun, SignalScope, SignalSummary,
};
pub use sweep::{sweep_thresholds, SweepError, ThresholdResult, DEFAULT_THRESHOLDS};
pub use synthetic::{synthetic_frame, write_feature_csv, SyntheticConfig};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn loaded_universe_is_send_sync() {
        assert_send::<LoadedUniverse>();
        assert_sync::<LoadedUniverse>();
    }

    #[test]
    fn labels_are_send_sync() {
        assert_send::<SymbolLabels>();
        assert_sync::<SymbolLabels>();
        assert_send::<LabelStats>();
        assert_sync::<LabelStats>();
    }

    #[test]
    fn signal_types_are_send_sync() {
        assert_send::<SignalRun>();
        assert_sync::<SignalRun>();
        assert_send::<FrameProbabilities>();
        assert_sync::<FrameProbabilities>();
    }

    #[test]
    fn evaluation_is_send_sync() {
        assert_send::<Evaluation>();
        assert_sync::<Evaluation>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
        assert_send::<ThresholdResult>();
        assert_sync::<ThresholdResult>();
    }

    #[test]
    fn artifacts_are_send_sync() {
        assert_send::<RunManifest>();
        assert_sync::<RunManifest>();
        assert_send::<SignalFile>();
        assert_sync::<SignalFile>();
    }
}
