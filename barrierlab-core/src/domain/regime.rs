//! Regime snapshot: precomputed volatility and trend context attached to a bar.

use serde::{Deserialize, Serialize};

/// Why a bar could not be labeled or scored.
///
/// Skips are expected and frequent (indicator warmup, gaps in feature
/// columns). They are counted, never raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// ATR is NaN or infinite.
    AtrUnavailable,
    /// ATR is zero or negative.
    AtrNonPositive,
    /// Volatility ratio or trend strength is NaN or infinite.
    RegimeUnavailable,
    /// No probability estimate exists for the bar.
    ProbabilityUnavailable,
    /// Probability is not a finite value in [0, 1].
    ProbabilityOutOfRange,
    /// Bar index is past the end of the series.
    OutOfRange,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AtrUnavailable => "atr_unavailable",
            SkipReason::AtrNonPositive => "atr_non_positive",
            SkipReason::RegimeUnavailable => "regime_unavailable",
            SkipReason::ProbabilityUnavailable => "probability_unavailable",
            SkipReason::ProbabilityOutOfRange => "probability_out_of_range",
            SkipReason::OutOfRange => "out_of_range",
        }
    }
}

/// Per-bar regime inputs, produced by an external feature stage.
///
/// Read-only to the engine. Missing values are represented as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    /// Average true range at the bar.
    pub atr: f64,
    /// Current ATR relative to its longer moving average; 1.0 = normal.
    pub volatility_ratio: f64,
    /// Bounded non-negative directional trend score.
    pub trend_strength: f64,
}

impl RegimeSnapshot {
    pub fn new(atr: f64, volatility_ratio: f64, trend_strength: f64) -> Self {
        Self {
            atr,
            volatility_ratio,
            trend_strength,
        }
    }

    /// A snapshot with every field unavailable.
    pub fn unavailable() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN)
    }

    /// Check the scoring precondition: ATR finite and > 0, regime fields finite.
    pub fn check(&self) -> Result<(), SkipReason> {
        if !self.atr.is_finite() {
            return Err(SkipReason::AtrUnavailable);
        }
        if self.atr <= 0.0 {
            return Err(SkipReason::AtrNonPositive);
        }
        if !self.volatility_ratio.is_finite() || !self.trend_strength.is_finite() {
            return Err(SkipReason::RegimeUnavailable);
        }
        Ok(())
    }

    pub fn is_usable(&self) -> bool {
        self.check().is_ok()
    }
}
