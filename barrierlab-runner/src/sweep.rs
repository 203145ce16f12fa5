//! Confidence-threshold sweep.
//!
//! Labels depend only on the barrier parameters, so they are computed once
//! and shared; each threshold regenerates history signals and settles them.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use barrierlab_core::{BarrierConfig, BarrierEngine, ConfigError, SymbolSeries};

use crate::evaluate::{evaluate_signals, EvaluateError, EvaluationConfig};
use crate::labeling::label_universe;
use crate::metrics::PerformanceMetrics;
use crate::signals::{generate_signals, ProbabilitySource, SignalScope};

/// Thresholds swept when none are given.
pub const DEFAULT_THRESHOLDS: [f64; 6] = [0.55, 0.6, 0.65, 0.7, 0.75, 0.8];

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("threshold {threshold}: {source}")]
    Threshold {
        threshold: f64,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Evaluate(#[from] EvaluateError),
}

/// Evaluation outcome at one confidence threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub threshold: f64,
    /// Signals emitted at this threshold.
    pub signals: usize,
    pub neutral_skipped: usize,
    pub unmatched: usize,
    pub metrics: PerformanceMetrics,
}

/// Evaluate history signals at each threshold, in input order.
pub fn sweep_thresholds<S>(
    config: &BarrierConfig,
    thresholds: &[f64],
    series: &[SymbolSeries],
    source: &S,
    eval_config: &EvaluationConfig,
) -> Result<Vec<ThresholdResult>, SweepError>
where
    S: ProbabilitySource + ?Sized,
{
    eval_config.validate()?;

    let engines = thresholds
        .iter()
        .map(|&threshold| {
            let config = BarrierConfig {
                confidence_threshold: threshold,
                ..config.clone()
            };
            BarrierEngine::new(config).map_err(|source| SweepError::Threshold { threshold, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some(first) = engines.first() else {
        return Ok(Vec::new());
    };
    let labels = label_universe(first, series);

    let results = engines
        .par_iter()
        .map(|engine| -> Result<ThresholdResult, SweepError> {
            let run = generate_signals(engine, series, source, SignalScope::History);
            let eval = evaluate_signals(&run.signals, &labels, eval_config)?;
            Ok(ThresholdResult {
                threshold: engine.config().confidence_threshold,
                signals: run.signals.len(),
                neutral_skipped: eval.neutral_skipped,
                unmatched: eval.unmatched,
                metrics: eval.metrics,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(thresholds = results.len(), "threshold sweep complete");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::FrameProbabilities;

    #[test]
    fn empty_sweep() {
        let results = sweep_thresholds(
            &BarrierConfig::default(),
            &[],
            &[],
            &FrameProbabilities::new(),
            &EvaluationConfig::default(),
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn threshold_without_neutral_zone_rejected() {
        let err = sweep_thresholds(
            &BarrierConfig::default(),
            &[0.6, 0.5],
            &[],
            &FrameProbabilities::new(),
            &EvaluationConfig::default(),
        )
        .unwrap_err();
        match err {
            SweepError::Threshold { threshold, source } => {
                assert_eq!(threshold, 0.5);
                assert_eq!(source, ConfigError::ConfidenceThreshold(0.5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_evaluation_settings_rejected() {
        let bad = EvaluationConfig {
            risk_per_trade: 2.0,
            ..Default::default()
        };
        let err = sweep_thresholds(
            &BarrierConfig::default(),
            &DEFAULT_THRESHOLDS,
            &[],
            &FrameProbabilities::new(),
            &bad,
        )
        .unwrap_err();
        assert!(matches!(err, SweepError::Evaluate(EvaluateError::RiskPerTrade(_))));
    }

    #[test]
    fn default_thresholds_are_valid_and_ascending() {
        for t in DEFAULT_THRESHOLDS {
            let config = BarrierConfig {
                confidence_threshold: t,
                ..Default::default()
            };
            assert!(BarrierEngine::new(config).is_ok());
        }
        assert!(DEFAULT_THRESHOLDS.windows(2).all(|w| w[0] < w[1]));
    }
}
