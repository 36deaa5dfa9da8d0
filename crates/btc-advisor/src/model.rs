//! Domain Models
//!
//! Market inputs, recommendations and the simulated wallet.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AdvisorError;

/// How long a recommendation stays actionable
pub const RECOMMENDATION_TTL_DAYS: i64 = 14;

/// A point-in-time view of the bitcoin market
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Current price in USD
    pub price: Decimal,

    /// Absolute 24-hour price change in USD
    pub change_24h_abs: Decimal,

    /// 24-hour price change percentage
    pub change_24h_pct: Decimal,

    /// 7-day price change percentage
    pub change_7d_pct: Option<Decimal>,

    /// Market capitalization in USD
    pub market_cap_usd: Option<Decimal>,

    /// 24-hour trading volume in USD
    pub volume_24h_usd: Option<Decimal>,

    /// Coins in circulation
    pub circulating_supply: Option<Decimal>,

    /// When the upstream last updated this data
    pub as_of: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(price: Decimal, change_24h_pct: Decimal) -> Self {
        Self {
            price,
            change_24h_abs: Decimal::ZERO,
            change_24h_pct,
            change_7d_pct: None,
            market_cap_usd: None,
            volume_24h_usd: None,
            circulating_supply: None,
            as_of: Utc::now(),
        }
    }

    /// Substituted when the price API cannot be reached or parsed
    pub fn fallback() -> Self {
        Self {
            price: dec!(60000),
            change_24h_abs: dec!(1200),
            change_24h_pct: dec!(2.0),
            change_7d_pct: None,
            market_cap_usd: Some(dec!(1200000000000)),
            volume_24h_usd: Some(dec!(50000000000)),
            circulating_supply: Some(dec!(19000000)),
            as_of: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.price > Decimal::ZERO
    }
}

/// Fear & Greed classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
}

impl SentimentLabel {
    /// Classify a raw index value using the index publisher's bands
    pub fn from_value(value: u8) -> Self {
        match value {
            0..=24 => Self::ExtremeFear,
            25..=46 => Self::Fear,
            47..=54 => Self::Neutral,
            55..=75 => Self::Greed,
            _ => Self::ExtremeGreed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtremeFear => "Extreme Fear",
            Self::Fear => "Fear",
            Self::Neutral => "Neutral",
            Self::Greed => "Greed",
            Self::ExtremeGreed => "Extreme Greed",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extreme fear" => Ok(Self::ExtremeFear),
            "fear" => Ok(Self::Fear),
            "neutral" => Ok(Self::Neutral),
            "greed" => Ok(Self::Greed),
            "extreme greed" => Ok(Self::ExtremeGreed),
            other => Err(AdvisorError::Parse(format!("unknown sentiment label '{other}'"))),
        }
    }
}

/// Market sentiment index (0 = extreme fear, 100 = extreme greed)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentIndex {
    pub value: u8,
    pub label: SentimentLabel,
}

impl SentimentIndex {
    /// Create with the label derived from the value
    pub fn new(value: u8) -> Self {
        Self {
            value,
            label: SentimentLabel::from_value(value),
        }
    }

    pub fn with_label(value: u8, label: SentimentLabel) -> Self {
        Self { value, label }
    }

    pub fn fallback() -> Self {
        Self::with_label(50, SentimentLabel::Neutral)
    }

    pub fn is_valid(&self) -> bool {
        self.value <= 100
    }
}

/// Aggregate verdict of the technical indicators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TechnicalLabel {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl fmt::Display for TechnicalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StrongBuy => "strong_buy",
            Self::Buy => "buy",
            Self::Neutral => "neutral",
            Self::Sell => "sell",
            Self::StrongSell => "strong_sell",
        })
    }
}

/// Technical indicator summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalScore {
    pub label: TechnicalLabel,
    pub buy_count: u32,
    pub sell_count: u32,
    pub neutral_count: u32,
}

impl TechnicalScore {
    pub fn new(label: TechnicalLabel, buy_count: u32, sell_count: u32) -> Self {
        Self {
            label,
            buy_count,
            sell_count,
            neutral_count: 0,
        }
    }

    pub fn neutral() -> Self {
        Self::canned(TechnicalLabel::Neutral)
    }

    /// Canned indicator tally over 26 oscillators and moving averages.
    ///
    /// There is no live indicator feed; the verdict follows the 24h move.
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        let pct = snapshot.change_24h_pct;
        let label = if pct >= dec!(5) {
            TechnicalLabel::StrongBuy
        } else if pct >= dec!(1) {
            TechnicalLabel::Buy
        } else if pct <= dec!(-5) {
            TechnicalLabel::StrongSell
        } else if pct <= dec!(-1) {
            TechnicalLabel::Sell
        } else {
            TechnicalLabel::Neutral
        };
        Self::canned(label)
    }

    fn canned(label: TechnicalLabel) -> Self {
        // (buy, sell, neutral) out of 26
        let (buy_count, sell_count, neutral_count) = match label {
            TechnicalLabel::StrongBuy => (20, 2, 4),
            TechnicalLabel::Buy => (14, 6, 6),
            TechnicalLabel::Neutral => (8, 8, 10),
            TechnicalLabel::Sell => (6, 14, 6),
            TechnicalLabel::StrongSell => (2, 20, 4),
        };
        Self {
            label,
            buy_count,
            sell_count,
            neutral_count,
        }
    }
}

/// One sample of the price chart
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub at: DateTime<Utc>,
    pub price: Decimal,
}

/// User-selected appetite for risk
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "moderate" => Ok(Self::Moderate),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(AdvisorError::Config(format!("unknown risk profile '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Buy,
    Sell,
    Hold,
    Dca,
    Alert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Active,
    Completed,
    Expired,
    Dismissed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    TechnicalAnalysis,
    FearGreedIndex,
    PriceAction,
    AiGenerated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// A metric that supports a recommendation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelatedMetric {
    pub name: String,
    pub value: Decimal,
    pub note: String,
}

impl RelatedMetric {
    pub fn new(name: impl Into<String>, value: impl Into<Decimal>, note: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            note: note.into(),
        }
    }
}

/// An actionable suggestion produced by one synthesis cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,

    pub title: String,

    pub description: String,

    pub category: RecommendationCategory,

    pub status: RecommendationStatus,

    pub source: RecommendationSource,

    pub risk_level: RiskLevel,

    /// Confidence (0-100)
    pub confidence: u8,

    /// Potential impact (1-10)
    pub potential_impact: u8,

    pub created_at: DateTime<Utc>,

    /// Always `created_at` + 14 days
    pub expires_at: DateTime<Utc>,

    pub related_metrics: Vec<RelatedMetric>,
}

impl Recommendation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub(crate) fn expiry_for(created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::days(RECOMMENDATION_TTL_DAYS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        })
    }
}

/// A simulated trade
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub usd_amount: Decimal,
    pub btc_amount: Decimal,
    pub price_at_execution: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        usd_amount: Decimal,
        btc_amount: Decimal,
        price_at_execution: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            usd_amount,
            btc_amount,
            price_at_execution,
            executed_at: Utc::now(),
        }
    }
}

/// The persisted mock wallet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletState {
    /// Fictitious USD available
    pub usd_balance: Decimal,

    /// Fictitious BTC held
    pub btc_balance: Decimal,

    /// Trade history, most recent first
    pub transactions: Vec<Transaction>,
}

impl Default for WalletState {
    fn default() -> Self {
        Self {
            usd_balance: dec!(10000),
            btc_balance: dec!(0.5),
            transactions: Vec::new(),
        }
    }
}

impl WalletState {
    /// Total value (cash + BTC at `price`)
    pub fn portfolio_value(&self, price: Decimal) -> Decimal {
        self.usd_balance + self.btc_balance * price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_bands() {
        assert_eq!(SentimentLabel::from_value(10), SentimentLabel::ExtremeFear);
        assert_eq!(SentimentLabel::from_value(30), SentimentLabel::Fear);
        assert_eq!(SentimentLabel::from_value(50), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_value(70), SentimentLabel::Greed);
        assert_eq!(SentimentLabel::from_value(90), SentimentLabel::ExtremeGreed);
        assert_eq!("extreme greed".parse::<SentimentLabel>().unwrap(), SentimentLabel::ExtremeGreed);
    }

    #[test]
    fn test_technical_score_from_snapshot() {
        let up = MarketSnapshot::new(dec!(60000), dec!(6.2));
        assert_eq!(TechnicalScore::from_snapshot(&up).label, TechnicalLabel::StrongBuy);

        let flat = MarketSnapshot::new(dec!(60000), dec!(0.3));
        let score = TechnicalScore::from_snapshot(&flat);
        assert_eq!(score.label, TechnicalLabel::Neutral);
        assert_eq!(score.buy_count + score.sell_count + score.neutral_count, 26);

        let down = MarketSnapshot::new(dec!(60000), dec!(-1.5));
        assert_eq!(TechnicalScore::from_snapshot(&down).label, TechnicalLabel::Sell);
    }

    #[test]
    fn test_technical_label_wire_format() {
        let json = serde_json::to_string(&TechnicalLabel::StrongBuy).unwrap();
        assert_eq!(json, "\"STRONG_BUY\"");
    }

    #[test]
    fn test_risk_profile_parse() {
        assert_eq!("Aggressive".parse::<RiskProfile>().unwrap(), RiskProfile::Aggressive);
        assert!("yolo".parse::<RiskProfile>().is_err());
        assert_eq!(RiskProfile::default(), RiskProfile::Moderate);
    }

    #[test]
    fn test_wallet_state_round_trip() {
        let mut wallet = WalletState::default();
        wallet.transactions.push(Transaction::new(
            TransactionKind::Buy,
            dec!(1000),
            dec!(0.0166666666666666666666666667),
            dec!(60000),
        ));

        let json = serde_json::to_string(&wallet).unwrap();
        let restored: WalletState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, wallet);
    }

    #[test]
    fn test_portfolio_value() {
        let wallet = WalletState::default();
        assert_eq!(wallet.portfolio_value(dec!(60000)), dec!(40000));
    }

    #[test]
    fn test_fallback_snapshot_is_valid() {
        assert!(MarketSnapshot::fallback().is_valid());
        assert_eq!(SentimentIndex::fallback().label, SentimentLabel::Neutral);
    }
}
