//! Signal types produced at inference time.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a trading decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
    None,
}

impl Direction {
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Direction::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
            Direction::None => "NONE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision for one bar with concrete price levels.
///
/// For `Direction::None` the target and stop equal the entry price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub confidence: f64,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_price: f64,
    pub risk_reward_ratio: f64,
}

/// An emitted signal, ready for an external persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub direction: Direction,
    pub confidence: f64,
    pub prob_long: f64,
    pub entry_price: f64,
    pub tp_price: f64,
    pub sl_price: f64,
    pub atr: f64,
    pub risk_reward_ratio: f64,
}
