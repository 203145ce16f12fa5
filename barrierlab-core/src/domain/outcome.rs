//! Hypothesis outcomes and the ternary training label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which hypothetical position is being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

/// Which barrier ended a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierKind {
    TakeProfit,
    StopLoss,
}

/// Result of scanning one hypothesis over the look-ahead window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HypothesisOutcome {
    /// A barrier was touched `offset` bars after the entry bar (1-based).
    Hit { kind: BarrierKind, offset: usize },
    /// The window elapsed without touching either barrier.
    NoHit,
}

impl HypothesisOutcome {
    /// +1 for take-profit, -1 for stop-loss, 0 for no hit.
    pub fn score(&self) -> i8 {
        match self {
            HypothesisOutcome::Hit {
                kind: BarrierKind::TakeProfit,
                ..
            } => 1,
            HypothesisOutcome::Hit {
                kind: BarrierKind::StopLoss,
                ..
            } => -1,
            HypothesisOutcome::NoHit => 0,
        }
    }
}

impl fmt::Display for HypothesisOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HypothesisOutcome::Hit {
                kind: BarrierKind::TakeProfit,
                offset,
            } => write!(f, "tp@{offset}"),
            HypothesisOutcome::Hit {
                kind: BarrierKind::StopLoss,
                offset,
            } => write!(f, "sl@{offset}"),
            HypothesisOutcome::NoHit => write!(f, "none"),
        }
    }
}

/// Ternary training label. Serialized as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Label {
    Short,
    Neutral,
    Long,
}

impl Label {
    pub fn as_i8(&self) -> i8 {
        match self {
            Label::Short => -1,
            Label::Neutral => 0,
            Label::Long => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Label::Short => "Short",
            Label::Neutral => "Neutral",
            Label::Long => "Long",
        }
    }
}

impl From<Label> for i8 {
    fn from(label: Label) -> i8 {
        label.as_i8()
    }
}

impl TryFrom<i8> for Label {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Label::Short),
            0 => Ok(Label::Neutral),
            1 => Ok(Label::Long),
            other => Err(format!("invalid label value {other}, expected -1, 0 or 1")),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.as_i8())
    }
}
