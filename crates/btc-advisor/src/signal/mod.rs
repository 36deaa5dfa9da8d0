//! Signals
//!
//! Rule-based recommendations, the analysis narrative and the demo signal.

mod demo;
mod narrative;
mod synthesizer;

pub use demo::{FixedSignal, MarketSignal, RandomSignal, SignalAction, SignalStrategy};
pub use narrative::{FALLBACK_NARRATIVE, format_price, format_usd};
pub use synthesizer::{MarketInputs, SignalSynthesizer, Synthesis, is_stable_move};
