//! Market Poller
//!
//! Background tasks that keep a shared [`MarketCache`] fresh. The price feed
//! and the sentiment feed refresh on independent periods; each tick writes
//! last-write-wins into the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::AdvisorError;
use crate::market::MarketDataSource;
use crate::model::{MarketSnapshot, SentimentIndex, TechnicalScore};

pub const DEFAULT_MARKET_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SENTIMENT_INTERVAL: Duration = Duration::from_secs(300);

/// Latest market data as shown to users
#[derive(Clone, Debug, Default, Serialize)]
pub struct MarketCache {
    pub snapshot: Option<MarketSnapshot>,
    pub sentiment: Option<SentimentIndex>,
    pub technical: Option<TechnicalScore>,
    /// Inline error message from the most recent failed fetch
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MarketCache {
    /// Cached snapshot, or the fallback if nothing has been fetched yet
    pub fn snapshot_or_fallback(&self) -> MarketSnapshot {
        self.snapshot.clone().unwrap_or_else(MarketSnapshot::fallback)
    }

    pub fn sentiment_or_fallback(&self) -> SentimentIndex {
        self.sentiment.clone().unwrap_or_else(SentimentIndex::fallback)
    }
}

pub type SharedCache = Arc<RwLock<MarketCache>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    pub market_interval: Duration,
    pub sentiment_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            market_interval: DEFAULT_MARKET_INTERVAL,
            sentiment_interval: DEFAULT_SENTIMENT_INTERVAL,
        }
    }
}

/// Refreshes the cache from a market data source
#[derive(Clone)]
pub struct MarketPoller {
    source: Arc<dyn MarketDataSource>,
    cache: SharedCache,
    config: PollerConfig,
}

impl MarketPoller {
    pub fn new(source: Arc<dyn MarketDataSource>, config: PollerConfig) -> Self {
        Self {
            source,
            cache: SharedCache::default(),
            config,
        }
    }

    /// Handle to the cache this poller writes into
    pub fn cache(&self) -> SharedCache {
        Arc::clone(&self.cache)
    }

    /// Fetch the snapshot once and write the outcome into the cache
    pub async fn refresh_market(&self) {
        let fetched = async {
            let snapshot = self.source.snapshot().await?;
            let technical = self.source.technical_score(&snapshot).await?;
            Ok::<_, AdvisorError>((snapshot, technical))
        }
        .await;

        let mut cache = self.cache.write().await;
        match fetched {
            Ok((snapshot, technical)) => {
                tracing::debug!(price = %snapshot.price, "Market snapshot refreshed");
                cache.snapshot = Some(snapshot);
                cache.technical = Some(technical);
                cache.last_error = None;
            }
            Err(e) => {
                tracing::warn!(source = self.source.name(), error = %e, "Market refresh failed, keeping cached value");
                if cache.snapshot.is_none() {
                    let snapshot = MarketSnapshot::fallback();
                    cache.technical = Some(TechnicalScore::from_snapshot(&snapshot));
                    cache.snapshot = Some(snapshot);
                }
                cache.last_error = Some(e.user_message());
            }
        }
        cache.updated_at = Some(Utc::now());
    }

    /// Fetch sentiment once and write the outcome into the cache
    pub async fn refresh_sentiment(&self) {
        let fetched = self.source.sentiment().await;

        let mut cache = self.cache.write().await;
        match fetched {
            Ok(sentiment) => {
                tracing::debug!(value = sentiment.value, "Sentiment refreshed");
                cache.sentiment = Some(sentiment);
                cache.last_error = None;
            }
            Err(e) => {
                tracing::warn!(source = self.source.name(), error = %e, "Sentiment refresh failed, keeping cached value");
                if cache.sentiment.is_none() {
                    cache.sentiment = Some(SentimentIndex::fallback());
                }
                cache.last_error = Some(e.user_message());
            }
        }
        cache.updated_at = Some(Utc::now());
    }

    /// Spawn both polling tasks. Each refreshes immediately, then on its period.
    pub fn start(&self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tracing::info!(
            "Market poller started (source: {}, market: {:?}, sentiment: {:?})",
            self.source.name(),
            self.config.market_interval,
            self.config.sentiment_interval
        );

        let market = {
            let poller = self.clone();
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(poller.config.market_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = interval.tick() => poller.refresh_market().await,
                        _ = shutdown.changed() => break,
                    }
                }
                tracing::debug!("Market polling task stopped");
            })
        };

        let sentiment = {
            let poller = self.clone();
            let mut shutdown = shutdown_rx;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(poller.config.sentiment_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = interval.tick() => poller.refresh_sentiment().await,
                        _ = shutdown.changed() => break,
                    }
                }
                tracing::debug!("Sentiment polling task stopped");
            })
        };

        PollerHandle {
            shutdown: shutdown_tx,
            tasks: vec![market, sentiment],
        }
    }
}

/// Owns the polling tasks. Dropping it cancels them.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// Signal both tasks to stop and wait for them to finish
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        for task in std::mem::take(&mut self.tasks) {
            let _ = task.await;
        }
        tracing::info!("Market poller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketSource;
    use crate::model::TechnicalLabel;
    use rust_decimal_macros::dec;

    fn poller(source: Arc<MockMarketSource>) -> MarketPoller {
        MarketPoller::new(
            source,
            PollerConfig {
                market_interval: Duration::from_secs(60),
                sentiment_interval: Duration::from_secs(300),
            },
        )
    }

    #[tokio::test]
    async fn test_refresh_fills_cache() {
        let source = Arc::new(MockMarketSource::new());
        let poller = poller(source);

        poller.refresh_market().await;
        poller.refresh_sentiment().await;

        let cache = poller.cache();
        let cache = cache.read().await;
        assert_eq!(cache.snapshot.as_ref().map(|s| s.price), Some(dec!(97500)));
        assert_eq!(cache.sentiment.as_ref().map(|s| s.value), Some(55));
        assert!(cache.technical.is_some());
        assert!(cache.last_error.is_none());
        assert!(cache.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_installs_fallback_when_empty() {
        let source = Arc::new(MockMarketSource::new());
        source.set_failing(true);
        let poller = poller(source);

        poller.refresh_market().await;
        poller.refresh_sentiment().await;

        let cache = poller.cache();
        let cache = cache.read().await;
        let snapshot = cache.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.price, dec!(60000));
        assert_eq!(snapshot.circulating_supply, Some(dec!(19000000)));
        assert_eq!(cache.sentiment, Some(SentimentIndex::fallback()));
        assert_eq!(
            cache.technical.as_ref().map(|t| t.label),
            Some(TechnicalLabel::Buy)
        );
        assert!(cache.last_error.is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_cached_value_and_success_clears_error() {
        let source = Arc::new(MockMarketSource::new());
        let poller = poller(Arc::clone(&source));

        poller.refresh_market().await;
        source.set_failing(true);
        source.set_snapshot(MarketSnapshot::new(dec!(1), dec!(0)));
        poller.refresh_market().await;

        {
            let cache = poller.cache();
            let cache = cache.read().await;
            assert_eq!(cache.snapshot.as_ref().map(|s| s.price), Some(dec!(97500)));
            assert!(cache.last_error.is_some());
        }

        source.set_failing(false);
        poller.refresh_market().await;

        let cache = poller.cache();
        let cache = cache.read().await;
        assert_eq!(cache.snapshot.as_ref().map(|s| s.price), Some(dec!(1)));
        assert!(cache.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_polls_and_stop_ends_tasks() {
        let source = Arc::new(MockMarketSource::new());
        let poller = poller(Arc::clone(&source));
        let handle = poller.start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(poller.cache().read().await.snapshot.is_some());
        assert!(poller.cache().read().await.sentiment.is_some());

        source.set_snapshot(MarketSnapshot::new(dec!(70000), dec!(-1)));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(
            poller.cache().read().await.snapshot.as_ref().map(|s| s.price),
            Some(dec!(70000))
        );

        assert!(handle.is_running());
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_tasks() {
        let source = Arc::new(MockMarketSource::new());
        let poller = poller(Arc::clone(&source));
        drop(poller.start());

        tokio::time::sleep(Duration::from_millis(10)).await;
        source.set_snapshot(MarketSnapshot::new(dec!(12345), dec!(0)));
        tokio::time::sleep(Duration::from_secs(120)).await;

        let cache = poller.cache();
        let price = cache.read().await.snapshot.as_ref().map(|s| s.price);
        assert_ne!(price, Some(dec!(12345)));
    }
}
