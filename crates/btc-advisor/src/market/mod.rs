//! Market Data
//!
//! Abstractions and implementations for the price and sentiment feeds.

mod http;
mod mock;

pub use http::{HttpMarketSource, MarketConfig};
pub use mock::MockMarketSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{MarketSnapshot, PricePoint, SentimentIndex, TechnicalScore};

/// Market data source trait (Strategy pattern)
///
/// A pure I/O boundary: implementations fetch and shape data, they never
/// substitute fallbacks. Callers decide what to show on failure.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest bitcoin price snapshot
    async fn snapshot(&self) -> Result<MarketSnapshot>;

    /// Latest fear & greed reading
    async fn sentiment(&self) -> Result<SentimentIndex>;

    /// Daily-or-finer price samples covering the last `days` days, oldest first
    async fn price_history(&self, days: u32) -> Result<Vec<PricePoint>>;

    /// Technical indicator summary for a snapshot
    async fn technical_score(&self, snapshot: &MarketSnapshot) -> Result<TechnicalScore> {
        Ok(TechnicalScore::from_snapshot(snapshot))
    }

    /// Source name
    fn name(&self) -> &str;
}
