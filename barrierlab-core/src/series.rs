//! Validated per-symbol bar series with aligned regime snapshots.
//!
//! Each symbol owns its own `SymbolSeries`; nothing is shared between
//! symbols, so independent series can be processed on independent threads.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::{Bar, RegimeSnapshot};

/// A malformed input series. Fatal for that symbol's run only.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeriesError {
    #[error("series for '{symbol}' is empty")]
    Empty { symbol: String },

    #[error("series for '{symbol}' has {bars} bars but {regimes} regime snapshots")]
    LengthMismatch {
        symbol: String,
        bars: usize,
        regimes: usize,
    },

    #[error("bar {index} of '{expected}' belongs to '{found}'")]
    SymbolMismatch {
        expected: String,
        found: String,
        index: usize,
    },

    #[error(
        "timestamps for '{symbol}' are not strictly increasing at bar {index}: {previous} then {current}"
    )]
    NonMonotonic {
        symbol: String,
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("bar {index} of '{symbol}' has an invalid {field} price")]
    InvalidPrice {
        symbol: String,
        index: usize,
        field: &'static str,
    },
}

/// One symbol's bars, oldest first, with one regime snapshot per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSeries {
    symbol: String,
    bars: Vec<Bar>,
    regimes: Vec<RegimeSnapshot>,
}

impl SymbolSeries {
    /// Validate and take ownership of a symbol's bars and regime snapshots.
    pub fn new(
        symbol: impl Into<String>,
        bars: Vec<Bar>,
        regimes: Vec<RegimeSnapshot>,
    ) -> Result<Self, SeriesError> {
        let symbol = symbol.into();

        if bars.is_empty() {
            return Err(SeriesError::Empty { symbol });
        }
        if bars.len() != regimes.len() {
            return Err(SeriesError::LengthMismatch {
                symbol,
                bars: bars.len(),
                regimes: regimes.len(),
            });
        }

        for (index, bar) in bars.iter().enumerate() {
            if bar.symbol != symbol {
                return Err(SeriesError::SymbolMismatch {
                    expected: symbol,
                    found: bar.symbol.clone(),
                    index,
                });
            }
            if let Some(field) = bar.invalid_price_field() {
                return Err(SeriesError::InvalidPrice {
                    symbol,
                    index,
                    field,
                });
            }
            if index > 0 {
                let previous = bars[index - 1].timestamp;
                if bar.timestamp <= previous {
                    return Err(SeriesError::NonMonotonic {
                        symbol,
                        index,
                        previous,
                        current: bar.timestamp,
                    });
                }
            }
        }

        Ok(Self {
            symbol,
            bars,
            regimes,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn regimes(&self) -> &[RegimeSnapshot] {
        &self.regimes
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bar and regime snapshot at `index`.
    pub fn get(&self, index: usize) -> Option<(&Bar, &RegimeSnapshot)> {
        Some((self.bars.get(index)?, self.regimes.get(index)?))
    }

    pub fn last_index(&self) -> usize {
        self.bars.len() - 1
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.bars.iter().map(|b| b.timestamp)
    }

    /// Number of bars failing the OHLC ordering sanity check.
    pub fn insane_bar_count(&self) -> usize {
        self.bars.iter().filter(|b| !b.is_sane()).count()
    }
}
