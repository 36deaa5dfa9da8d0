//! Application State

use std::sync::Arc;

use tokio::sync::Mutex;

use btc_advisor::{
    CannedChatbot, MarketDataSource, SharedCache, SignalStrategy, SignalSynthesizer, WalletLedger,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Market data source (HTTP or mock)
    pub source: Arc<dyn MarketDataSource>,

    /// Latest polled market data
    pub cache: SharedCache,

    /// Simulated wallet; the mutex makes it single-writer
    pub ledger: Arc<Mutex<WalletLedger>>,

    /// Headline demo signal
    pub signal: Arc<dyn SignalStrategy>,

    pub synthesizer: SignalSynthesizer,

    pub chatbot: Arc<CannedChatbot>,
}
