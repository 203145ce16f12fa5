//! Batch labeling over a universe of symbols.
//!
//! Symbols are independent, so they are labeled with a rayon parallel map
//! and no shared mutable state. Output order follows input order.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use barrierlab_core::domain::Label;
use barrierlab_core::{BarLabel, BarrierEngine, SymbolSeries};

/// Label distribution for one symbol or a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelStats {
    pub total: usize,
    pub long: usize,
    pub short: usize,
    pub neutral: usize,
    /// Bars that failed the precondition. Counted inside `neutral` too.
    pub skipped: usize,
    pub skip_reasons: BTreeMap<String, usize>,
}

impl LabelStats {
    pub fn from_labels(labels: &[BarLabel]) -> Self {
        let mut stats = Self::default();
        for label in labels {
            stats.total += 1;
            match label.label() {
                Label::Long => stats.long += 1,
                Label::Short => stats.short += 1,
                Label::Neutral => stats.neutral += 1,
            }
            if let Some(reason) = label.skip_reason() {
                stats.skipped += 1;
                *stats
                    .skip_reasons
                    .entry(reason.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }
        stats
    }

    pub fn merge(&mut self, other: &LabelStats) {
        self.total += other.total;
        self.long += other.long;
        self.short += other.short;
        self.neutral += other.neutral;
        self.skipped += other.skipped;
        for (reason, count) in &other.skip_reasons {
            *self.skip_reasons.entry(reason.clone()).or_insert(0) += count;
        }
    }

    pub fn long_pct(&self) -> f64 {
        pct(self.long, self.total)
    }

    pub fn short_pct(&self) -> f64 {
        pct(self.short, self.total)
    }

    pub fn neutral_pct(&self) -> f64 {
        pct(self.neutral, self.total)
    }
}

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Labels for one symbol, aligned with its bars.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolLabels {
    pub symbol: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub labels: Vec<BarLabel>,
    pub stats: LabelStats,
}

impl SymbolLabels {
    /// Label at an exact timestamp.
    pub fn label_at(&self, timestamp: NaiveDateTime) -> Option<&BarLabel> {
        let i = self.timestamps.binary_search(&timestamp).ok()?;
        self.labels.get(i)
    }
}

pub fn label_symbol(engine: &BarrierEngine, series: &SymbolSeries) -> SymbolLabels {
    let labels = engine.label_series(series);
    let stats = LabelStats::from_labels(&labels);

    info!(
        symbol = series.symbol(),
        total = stats.total,
        long = stats.long,
        short = stats.short,
        neutral = stats.neutral,
        skipped = stats.skipped,
        "labeled symbol: long {:.1}% / short {:.1}% / neutral {:.1}%",
        stats.long_pct(),
        stats.short_pct(),
        stats.neutral_pct(),
    );

    SymbolLabels {
        symbol: series.symbol().to_string(),
        timestamps: series.timestamps().collect(),
        labels,
        stats,
    }
}

/// Label every symbol in parallel.
pub fn label_universe(engine: &BarrierEngine, series: &[SymbolSeries]) -> Vec<SymbolLabels> {
    series
        .par_iter()
        .map(|s| label_symbol(engine, s))
        .collect()
}

/// Combined distribution across symbols.
pub fn overall_stats(labels: &[SymbolLabels]) -> LabelStats {
    labels.iter().fold(LabelStats::default(), |mut acc, l| {
        acc.merge(&l.stats);
        acc
    })
}
