//! Demo Market Signal
//!
//! The headline BUY/SELL/HOLD badge. It is not derived from market data;
//! strategies are pluggable so the random demo and a fixed signal can be
//! swapped in tests.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const MIN_CONFIDENCE: u8 = 60;
pub const MAX_CONFIDENCE: u8 = 95;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub const ALL: [Self; 3] = [Self::Hold, Self::Sell, Self::Buy];
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSignal {
    pub action: SignalAction,
    /// Confidence percentage (60-95)
    pub confidence: u8,
    pub generated_at: DateTime<Utc>,
}

/// Produces the headline signal
pub trait SignalStrategy: Send + Sync {
    fn next_signal(&self) -> MarketSignal;

    fn name(&self) -> &str;
}

/// Uniformly random action and confidence
pub struct RandomSignal {
    rng: Mutex<StdRng>,
}

impl Default for RandomSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSignal {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence for demos and tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SignalStrategy for RandomSignal {
    fn next_signal(&self) -> MarketSignal {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let action = SignalAction::ALL[rng.gen_range(0..SignalAction::ALL.len())];
        let confidence = rng.gen_range(MIN_CONFIDENCE..=MAX_CONFIDENCE);
        MarketSignal {
            action,
            confidence,
            generated_at: Utc::now(),
        }
    }

    fn name(&self) -> &str {
        "random"
    }
}

/// Always the same signal
pub struct FixedSignal {
    action: SignalAction,
    confidence: u8,
}

impl FixedSignal {
    pub fn new(action: SignalAction, confidence: u8) -> Self {
        Self {
            action,
            confidence: confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE),
        }
    }
}

impl SignalStrategy for FixedSignal {
    fn next_signal(&self) -> MarketSignal {
        MarketSignal {
            action: self.action,
            confidence: self.confidence,
            generated_at: Utc::now(),
        }
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
