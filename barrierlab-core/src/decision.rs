//! Signal decision: probability + threshold + barrier multiples → `Signal`.

use crate::domain::{Direction, Signal};

/// Turn a long-win probability into a directional signal with price levels.
///
/// - `p >= threshold` → LONG, confidence `p`
/// - `p <= 1 - threshold` → SHORT, confidence `1 - p`
/// - otherwise NONE, confidence `max(p, 1 - p)`
///
/// A non-finite or non-positive ATR, or a probability outside [0, 1], yields
/// NONE. The risk-reward ratio is `tp_mult / sl_mult` for every direction.
pub fn decide(
    probability: f64,
    confidence_threshold: f64,
    entry_price: f64,
    atr: f64,
    tp_mult: f64,
    sl_mult: f64,
) -> Signal {
    let risk_reward_ratio = tp_mult / sl_mult;

    if !(probability.is_finite() && (0.0..=1.0).contains(&probability)) {
        return no_signal(0.0, entry_price, risk_reward_ratio);
    }

    let atr_usable = atr.is_finite() && atr > 0.0;
    let neutral_confidence = probability.max(1.0 - probability);
    if !atr_usable {
        return no_signal(neutral_confidence, entry_price, risk_reward_ratio);
    }

    if probability >= confidence_threshold {
        Signal {
            direction: Direction::Long,
            confidence: probability,
            entry_price,
            target_price: entry_price + tp_mult * atr,
            stop_price: entry_price - sl_mult * atr,
            risk_reward_ratio,
        }
    } else if probability <= 1.0 - confidence_threshold {
        Signal {
            direction: Direction::Short,
            confidence: 1.0 - probability,
            entry_price,
            target_price: entry_price - tp_mult * atr,
            stop_price: entry_price + sl_mult * atr,
            risk_reward_ratio,
        }
    } else {
        no_signal(neutral_confidence, entry_price, risk_reward_ratio)
    }
}

fn no_signal(confidence: f64, entry_price: f64, risk_reward_ratio: f64) -> Signal {
    Signal {
        direction: Direction::None,
        confidence,
        entry_price,
        target_price: entry_price,
        stop_price: entry_price,
        risk_reward_ratio,
    }
}
