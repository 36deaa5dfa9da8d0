//! Mock Market Source
//!
//! For testing and demo purposes. Returns realistic static data that can be
//! swapped at runtime, or made to fail.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::MarketDataSource;
use crate::error::{AdvisorError, Result};
use crate::model::{MarketSnapshot, PricePoint, SentimentIndex};

struct MockState {
    snapshot: MarketSnapshot,
    sentiment: SentimentIndex,
    /// When set, every fetch fails with a 503
    failing: bool,
}

/// Mock market source with static data
pub struct MockMarketSource {
    state: Mutex<MockState>,
}

impl Default for MockMarketSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketSource {
    pub fn new() -> Self {
        let mut snapshot = MarketSnapshot::new(dec!(97500), dec!(2.5));
        snapshot.change_24h_abs = dec!(2378.05);
        snapshot.change_7d_pct = Some(dec!(4.1));
        snapshot.market_cap_usd = Some(dec!(1930000000000));
        snapshot.volume_24h_usd = Some(dec!(25000000000));
        snapshot.circulating_supply = Some(dec!(19800000));

        Self {
            state: Mutex::new(MockState {
                snapshot,
                sentiment: SentimentIndex::new(55),
                failing: false,
            }),
        }
    }

    pub fn with_snapshot(self, snapshot: MarketSnapshot) -> Self {
        self.set_snapshot(snapshot);
        self
    }

    pub fn with_sentiment(self, sentiment: SentimentIndex) -> Self {
        self.set_sentiment(sentiment);
        self
    }

    pub fn set_snapshot(&self, snapshot: MarketSnapshot) {
        self.lock().snapshot = snapshot;
    }

    pub fn set_sentiment(&self, sentiment: SentimentIndex) {
        self.lock().sentiment = sentiment;
    }

    /// Make subsequent fetches fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<()> {
        if self.lock().failing {
            return Err(AdvisorError::UpstreamStatus {
                status: 503,
                url: "mock://market".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for MockMarketSource {
    async fn snapshot(&self) -> Result<MarketSnapshot> {
        self.check()?;
        let mut snapshot = self.lock().snapshot.clone();
        snapshot.as_of = Utc::now();
        Ok(snapshot)
    }

    async fn sentiment(&self) -> Result<SentimentIndex> {
        self.check()?;
        Ok(self.lock().sentiment.clone())
    }

    async fn price_history(&self, days: u32) -> Result<Vec<PricePoint>> {
        self.check()?;
        let price = self.lock().snapshot.price;
        let now = Utc::now();

        // A gentle sawtooth ending at the current price, one sample per day
        let points = (0..=days)
            .map(|i| {
                let days_ago = days - i;
                let wobble = Decimal::from(days_ago % 4) * dec!(0.005);
                PricePoint {
                    at: now - Duration::days(i64::from(days_ago)),
                    price: (price * (Decimal::ONE - wobble)).round_dp(2),
                }
            })
            .collect();
        Ok(points)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
