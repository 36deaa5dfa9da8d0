//! HTTP Market Data Source
//!
//! Price data from a CoinGecko-compatible API, sentiment from an
//! alternative.me-compatible Fear & Greed API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::MarketDataSource;
use crate::error::{AdvisorError, Result};
use crate::model::{MarketSnapshot, PricePoint, SentimentIndex, SentimentLabel};

pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_SENTIMENT_API_URL: &str = "https://api.alternative.me";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Endpoints and limits for the HTTP source
#[derive(Clone, Debug)]
pub struct MarketConfig {
    /// Price API base URL
    pub price_api_url: String,

    /// Sentiment API base URL
    pub sentiment_api_url: String,

    /// Upper bound on each fetch; a slower response counts as failed
    pub timeout: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            price_api_url: DEFAULT_PRICE_API_URL.into(),
            sentiment_api_url: DEFAULT_SENTIMENT_API_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl MarketConfig {
    /// Build from any key lookup (environment, `.env`, test map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout_secs = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Ignoring invalid HTTP_TIMEOUT_SECS");
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            price_api_url: lookup("PRICE_API_URL").unwrap_or(defaults.price_api_url),
            sentiment_api_url: lookup("SENTIMENT_API_URL").unwrap_or(defaults.sentiment_api_url),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Live market data over HTTP
pub struct HttpMarketSource {
    http: Client,
    config: MarketConfig,
}

impl HttpMarketSource {
    pub fn new(config: MarketConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("btc-advisor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisorError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| AdvisorError::Parse(format!("{url}: {e}")))
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketSource {
    async fn snapshot(&self) -> Result<MarketSnapshot> {
        let url = format!("{}/coins/bitcoin", self.config.price_api_url);
        let coin: CoinResponse = self
            .get(
                &url,
                &[
                    ("localization", "false"),
                    ("tickers", "false"),
                    ("market_data", "true"),
                    ("community_data", "false"),
                    ("developer_data", "false"),
                    ("sparkline", "false"),
                ],
            )
            .await?;
        coin.into_snapshot()
    }

    async fn sentiment(&self) -> Result<SentimentIndex> {
        let url = format!("{}/fng/", self.config.sentiment_api_url);
        let fng: FearGreedResponse = self.get(&url, &[]).await?;
        fng.into_index()
    }

    async fn price_history(&self, days: u32) -> Result<Vec<PricePoint>> {
        let url = format!("{}/coins/bitcoin/market_chart", self.config.price_api_url);
        let days = days.to_string();
        let chart: MarketChartResponse = self
            .get(&url, &[("vs_currency", "usd"), ("days", days.as_str())])
            .await?;
        chart.into_points()
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// Wire formats
// ============================================================================

#[derive(Debug, Deserialize)]
struct UsdValue {
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    current_price: Option<UsdValue>,
    price_change_24h_in_currency: Option<UsdValue>,
    price_change_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d: Option<f64>,
    market_cap: Option<UsdValue>,
    total_volume: Option<UsdValue>,
    circulating_supply: Option<f64>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    market_data: Option<CoinMarketData>,
    last_updated: Option<DateTime<Utc>>,
}

impl CoinResponse {
    fn into_snapshot(self) -> Result<MarketSnapshot> {
        let data = self
            .market_data
            .ok_or_else(|| AdvisorError::Parse("missing market_data".into()))?;

        let price = data
            .current_price
            .and_then(|p| p.usd)
            .ok_or_else(|| AdvisorError::Parse("missing market_data.current_price.usd".into()))
            .and_then(|v| to_decimal("current_price.usd", v))?;
        if price <= Decimal::ZERO {
            return Err(AdvisorError::Parse(format!("non-positive price {price}")));
        }

        let change_24h_pct = data
            .price_change_percentage_24h
            .ok_or_else(|| AdvisorError::Parse("missing price_change_percentage_24h".into()))
            .and_then(|v| to_decimal("price_change_percentage_24h", v))?;

        let change_24h_abs = data
            .price_change_24h_in_currency
            .and_then(|c| c.usd)
            .or(data.price_change_24h)
            .map(|v| to_decimal("price_change_24h", v))
            .transpose()?
            .unwrap_or(Decimal::ZERO);

        Ok(MarketSnapshot {
            price,
            change_24h_abs,
            change_24h_pct,
            change_7d_pct: optional_decimal(data.price_change_percentage_7d),
            market_cap_usd: optional_decimal(data.market_cap.and_then(|m| m.usd)),
            volume_24h_usd: optional_decimal(data.total_volume.and_then(|v| v.usd)),
            circulating_supply: optional_decimal(data.circulating_supply),
            as_of: self
                .last_updated
                .or(data.last_updated)
                .unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    /// The API sends this as a string; accept numbers too
    value: serde_json::Value,
    value_classification: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
}

impl FearGreedResponse {
    fn into_index(self) -> Result<SentimentIndex> {
        let entry = self
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::Parse("empty fear & greed data".into()))?;

        let value = match &entry.value {
            serde_json::Value::String(s) => s.trim().parse::<u8>().ok(),
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
            _ => None,
        }
        .filter(|v| *v <= 100)
        .ok_or_else(|| AdvisorError::Parse(format!("bad fear & greed value {}", entry.value)))?;

        let label = entry
            .value_classification
            .as_deref()
            .and_then(|s| s.parse::<SentimentLabel>().ok())
            .unwrap_or_else(|| SentimentLabel::from_value(value));

        Ok(SentimentIndex::with_label(value, label))
    }
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<[f64; 2]>,
}

impl MarketChartResponse {
    fn into_points(self) -> Result<Vec<PricePoint>> {
        self.prices
            .into_iter()
            .map(|[millis, price]| {
                #[allow(clippy::cast_possible_truncation)]
                let at = DateTime::from_timestamp_millis(millis as i64)
                    .ok_or_else(|| AdvisorError::Parse(format!("bad timestamp {millis}")))?;
                Ok(PricePoint {
                    at,
                    price: to_decimal("prices", price)?,
                })
            })
            .collect()
    }
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| AdvisorError::Parse(format!("{field} is not a number: {value}")))
}

fn optional_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(Decimal::from_f64)
}
