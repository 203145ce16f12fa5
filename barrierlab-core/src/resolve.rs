//! Label resolver: two hypothesis outcomes in, one ternary label out.

use std::cmp::Ordering;

use crate::domain::{HypothesisOutcome, Label};

/// Compare the long and short scores.
///
/// The better-scoring side wins; equal scores (both no-hit, both take-profit,
/// both stop-loss) are ambiguous and resolve to `Neutral`. Offsets are not
/// consulted: path dependence is already captured by the scanner.
pub fn resolve(long: HypothesisOutcome, short: HypothesisOutcome) -> Label {
    match long.score().cmp(&short.score()) {
        Ordering::Greater => Label::Long,
        Ordering::Less => Label::Short,
        Ordering::Equal => Label::Neutral,
    }
}
