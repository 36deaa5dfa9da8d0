//! Server Configuration
//!
//! Every key is optional. Unparseable values fall back to the default.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use btc_advisor::market::MarketConfig;
use btc_advisor::poller::{DEFAULT_MARKET_INTERVAL, DEFAULT_SENTIMENT_INTERVAL, PollerConfig};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_WALLET_PATH: &str = "data/btc_wallet.json";
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub wallet_path: PathBuf,
    /// Front-end assets served for any unmatched path
    pub static_dir: PathBuf,
    pub market: MarketConfig,
    pub poller: PollerConfig,
    pub use_mock_market: bool,
    pub demo_signal_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            wallet_path: DEFAULT_WALLET_PATH.into(),
            static_dir: DEFAULT_STATIC_DIR.into(),
            market: MarketConfig::default(),
            poller: PollerConfig::default(),
            use_mock_market: false,
            demo_signal_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let market_secs = parse_or(&lookup, "MARKET_POLL_SECS", DEFAULT_MARKET_INTERVAL.as_secs());
        let sentiment_secs =
            parse_or(&lookup, "SENTIMENT_POLL_SECS", DEFAULT_SENTIMENT_INTERVAL.as_secs());

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            wallet_path: lookup("WALLET_PATH").map_or(defaults.wallet_path, PathBuf::from),
            static_dir: lookup("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            market: MarketConfig::from_lookup(&lookup),
            poller: PollerConfig {
                market_interval: Duration::from_secs(market_secs.max(1)),
                sentiment_interval: Duration::from_secs(sentiment_secs.max(1)),
            },
            use_mock_market: parse_or(&lookup, "USE_MOCK_MARKET", false),
            demo_signal_seed: lookup("DEMO_SIGNAL_SEED").and_then(|raw| {
                raw.trim()
                    .parse()
                    .inspect_err(|_| tracing::warn!(value = %raw, "Ignoring invalid DEMO_SIGNAL_SEED"))
                    .ok()
            }),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring invalid value, using default");
            default
        }),
        None => default,
    }
}
