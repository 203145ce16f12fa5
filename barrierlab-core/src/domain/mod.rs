//! Domain types for BarrierLab

pub mod bar;
pub mod outcome;
pub mod regime;
pub mod signal;

pub use bar::Bar;
pub use outcome::{BarrierKind, HypothesisOutcome, Label, Side};
pub use regime::{RegimeSnapshot, SkipReason};
pub use signal::{Direction, Signal, SignalRecord};
