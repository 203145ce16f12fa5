//! The barrier engine: one validated configuration shared by labeling and
//! signal generation.
//!
//! Both paths go through `BarrierEngine::parameters`, so a bar labeled during
//! training and the same bar scored live always see identical take-profit,
//! stop-loss and horizon values.

use serde::{Deserialize, Serialize};

use crate::barrier::{select_parameters, BarrierLevels, BarrierParams};
use crate::config::{BarrierConfig, ConfigError};
use crate::decision::decide;
use crate::domain::{Label, RegimeSnapshot, SignalRecord, SkipReason};
use crate::fingerprint::ConfigFingerprint;
use crate::resolve::resolve;
use crate::scan::{scan, ScanOutcome};
use crate::series::SymbolSeries;

/// Everything computed for a labeled bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelDetail {
    pub label: Label,
    pub params: BarrierParams,
    pub levels: BarrierLevels,
    pub outcome: ScanOutcome,
}

/// Result of labeling one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BarLabel {
    Labeled(LabelDetail),
    /// The bar failed the precondition. Its label is Neutral.
    Skipped(SkipReason),
}

impl BarLabel {
    pub fn label(&self) -> Label {
        match self {
            BarLabel::Labeled(detail) => detail.label,
            BarLabel::Skipped(_) => Label::Neutral,
        }
    }

    pub fn detail(&self) -> Option<&LabelDetail> {
        match self {
            BarLabel::Labeled(detail) => Some(detail),
            BarLabel::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            BarLabel::Labeled(_) => None,
            BarLabel::Skipped(reason) => Some(*reason),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, BarLabel::Skipped(_))
    }
}

/// Validated configuration plus the label and signal operations built on it.
#[derive(Debug, Clone, PartialEq)]
pub struct BarrierEngine {
    config: BarrierConfig,
    fingerprint: ConfigFingerprint,
}

impl BarrierEngine {
    pub fn new(config: BarrierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fingerprint = ConfigFingerprint::of(&config);
        Ok(Self {
            config,
            fingerprint,
        })
    }

    pub fn config(&self) -> &BarrierConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &ConfigFingerprint {
        &self.fingerprint
    }

    pub fn parameters(&self, regime: &RegimeSnapshot) -> BarrierParams {
        select_parameters(regime, &self.config)
    }

    /// Label the bar at `index`.
    pub fn label_at(&self, series: &SymbolSeries, index: usize) -> BarLabel {
        let Some((bar, regime)) = series.get(index) else {
            return BarLabel::Skipped(SkipReason::OutOfRange);
        };
        if let Err(reason) = regime.check() {
            return BarLabel::Skipped(reason);
        }

        let params = self.parameters(regime);
        let levels = BarrierLevels::from_params(bar.close, regime.atr, &params);
        let outcome = scan(series.bars(), index, &levels, params.horizon);
        BarLabel::Labeled(LabelDetail {
            label: resolve(outcome.long, outcome.short),
            params,
            levels,
            outcome,
        })
    }

    /// Label every bar of a series, oldest first.
    pub fn label_series(&self, series: &SymbolSeries) -> Vec<BarLabel> {
        (0..series.len()).map(|i| self.label_at(series, i)).collect()
    }

    /// Score the bar at `index` with a long-win probability.
    ///
    /// Returns `Ok(None)` when the decision is NONE and `Err` when the bar
    /// cannot be scored at all.
    pub fn signal_at(
        &self,
        series: &SymbolSeries,
        index: usize,
        probability: Option<f64>,
    ) -> Result<Option<SignalRecord>, SkipReason> {
        let (bar, regime) = series.get(index).ok_or(SkipReason::OutOfRange)?;
        regime.check()?;
        let p = probability.ok_or(SkipReason::ProbabilityUnavailable)?;
        if !(p.is_finite() && (0.0..=1.0).contains(&p)) {
            return Err(SkipReason::ProbabilityOutOfRange);
        }

        let params = self.parameters(regime);
        let signal = decide(
            p,
            self.config.confidence_threshold,
            bar.close,
            regime.atr,
            params.tp_mult,
            params.sl_mult,
        );
        if !signal.direction.is_actionable() {
            return Ok(None);
        }

        Ok(Some(SignalRecord {
            timestamp: bar.timestamp,
            symbol: series.symbol().to_string(),
            direction: signal.direction,
            confidence: signal.confidence,
            prob_long: p,
            entry_price: signal.entry_price,
            tp_price: signal.target_price,
            sl_price: signal.stop_price,
            atr: regime.atr,
            risk_reward_ratio: signal.risk_reward_ratio,
        }))
    }
}
