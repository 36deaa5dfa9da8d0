//! # btc-advisor
//!
//! Bitcoin market dashboard core: live price and sentiment feeds, rule-based
//! trade recommendations with a plain-English narrative, and a simulated
//! wallet for paper trading.
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐   poll   ┌──────────────┐        ┌───────────────────┐
//! │ Price API    │─────────▶│              │        │ SignalSynthesizer │
//! │ (CoinGecko)  │          │ MarketPoller │───────▶│  rules ─▶ recs    │
//! ├──────────────┤   poll   │  └ MarketCache        │  narrative        │
//! │ Fear & Greed │─────────▶│              │        └───────────────────┘
//! └──────────────┘          └──────┬───────┘
//!                                  │ price
//!                                  ▼
//!                           ┌──────────────┐  save   ┌─────────────┐
//!                           │ WalletLedger │────────▶│ WalletStore │
//!                           └──────────────┘         └─────────────┘
//! ```
//!
//! Nothing here moves real money. Recommendations are heuristics for display.

pub mod chat;
pub mod error;
pub mod market;
pub mod model;
pub mod poller;
pub mod signal;
pub mod wallet;

pub use chat::{CannedChatbot, ChatMessage};
pub use error::{AdvisorError, ErrorClass, Result};
pub use market::{HttpMarketSource, MarketConfig, MarketDataSource, MockMarketSource};
pub use model::{
    MarketSnapshot, PricePoint, Recommendation, RiskProfile, SentimentIndex, TechnicalScore,
    Transaction, WalletState,
};
pub use poller::{MarketCache, MarketPoller, PollerConfig, PollerHandle, SharedCache};
pub use signal::{MarketInputs, SignalStrategy, SignalSynthesizer, Synthesis};
pub use wallet::{FileWalletStore, MemoryWalletStore, WalletLedger, WalletStore};
