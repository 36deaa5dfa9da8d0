//! Recommendation Synthesizer
//!
//! Fixed-threshold rules over the latest snapshot, sentiment and technical
//! score. Each rule group fires at most once per cycle, so a cycle yields
//! between zero and three recommendations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::narrative::{self, FALLBACK_NARRATIVE};
use crate::model::{
    MarketSnapshot, Recommendation, RecommendationCategory, RecommendationSource,
    RecommendationStatus, RelatedMetric, RiskLevel, RiskProfile, SentimentIndex, TechnicalLabel,
    TechnicalScore,
};

/// Inputs for one synthesis cycle. Any of them may be missing.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarketInputs<'a> {
    pub snapshot: Option<&'a MarketSnapshot>,
    pub sentiment: Option<&'a SentimentIndex>,
    pub technical: Option<&'a TechnicalScore>,
}

impl<'a> MarketInputs<'a> {
    pub fn new(
        snapshot: &'a MarketSnapshot,
        sentiment: &'a SentimentIndex,
        technical: &'a TechnicalScore,
    ) -> Self {
        Self {
            snapshot: Some(snapshot),
            sentiment: Some(sentiment),
            technical: Some(technical),
        }
    }
}

/// Output of one synthesis cycle. Replaces the previous cycle wholesale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Synthesis {
    pub recommendations: Vec<Recommendation>,
    pub narrative: String,
}

impl Synthesis {
    fn fallback() -> Self {
        Self {
            recommendations: Vec::new(),
            narrative: FALLBACK_NARRATIVE.into(),
        }
    }
}

/// Rule-based recommendation engine
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalSynthesizer;

impl SignalSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(&self, inputs: MarketInputs<'_>, profile: RiskProfile) -> Synthesis {
        self.synthesize_at(inputs, profile, Utc::now())
    }

    /// Synthesize with an explicit creation time
    pub fn synthesize_at(
        &self,
        inputs: MarketInputs<'_>,
        profile: RiskProfile,
        now: DateTime<Utc>,
    ) -> Synthesis {
        let (Some(snapshot), Some(sentiment), Some(technical)) =
            (inputs.snapshot, inputs.sentiment, inputs.technical)
        else {
            tracing::warn!("Synthesis skipped: missing market inputs");
            return Synthesis::fallback();
        };

        if !snapshot.is_valid() || !sentiment.is_valid() {
            tracing::warn!(
                price = %snapshot.price,
                sentiment = sentiment.value,
                "Synthesis skipped: malformed market inputs"
            );
            return Synthesis::fallback();
        }

        let recommendations: Vec<Recommendation> = [
            sentiment_rule(sentiment),
            technical_rule(technical),
            price_action_rule(snapshot),
        ]
        .into_iter()
        .flatten()
        .map(|draft| draft.into_recommendation(now))
        .collect();

        tracing::debug!(
            count = recommendations.len(),
            profile = %profile,
            "Synthesized recommendations"
        );

        Synthesis {
            recommendations,
            narrative: narrative::compose(snapshot, sentiment, technical, profile),
        }
    }
}

/// A recommendation before it gets an identity and timestamps
struct Draft {
    title: &'static str,
    description: String,
    category: RecommendationCategory,
    risk_level: RiskLevel,
    source: RecommendationSource,
    confidence: u8,
    potential_impact: u8,
    related_metrics: Vec<RelatedMetric>,
}

impl Draft {
    fn into_recommendation(self, now: DateTime<Utc>) -> Recommendation {
        Recommendation {
            id: Uuid::new_v4(),
            title: self.title.into(),
            description: self.description,
            category: self.category,
            status: RecommendationStatus::Active,
            source: self.source,
            risk_level: self.risk_level,
            confidence: self.confidence,
            potential_impact: self.potential_impact,
            created_at: now,
            expires_at: Recommendation::expiry_for(now),
            related_metrics: self.related_metrics,
        }
    }
}

fn sentiment_rule(sentiment: &SentimentIndex) -> Option<Draft> {
    let metrics = vec![RelatedMetric::new(
        "Fear & Greed Index",
        sentiment.value,
        "Primary indicator",
    )];

    if sentiment.value <= 25 {
        Some(Draft {
            title: "Extreme Fear: Consider Buying Opportunity",
            description: "Market sentiment is showing extreme fear. Historically, this has often represented a good buying opportunity.".into(),
            category: RecommendationCategory::Buy,
            risk_level: RiskLevel::Medium,
            source: RecommendationSource::FearGreedIndex,
            confidence: 75,
            potential_impact: 7,
            related_metrics: metrics,
        })
    } else if sentiment.value >= 75 {
        Some(Draft {
            title: "Extreme Greed: Consider Taking Profits",
            description: "Market sentiment is showing extreme greed. This may indicate the market is due for a correction.".into(),
            category: RecommendationCategory::Sell,
            risk_level: RiskLevel::Medium,
            source: RecommendationSource::FearGreedIndex,
            confidence: 70,
            potential_impact: 6,
            related_metrics: metrics,
        })
    } else {
        None
    }
}

fn technical_rule(technical: &TechnicalScore) -> Option<Draft> {
    match technical.label {
        TechnicalLabel::StrongBuy => Some(Draft {
            title: "Strong Buy Signal from Technical Indicators",
            description: "Multiple technical indicators are aligned suggesting a strong buy opportunity.".into(),
            category: RecommendationCategory::Buy,
            risk_level: RiskLevel::Medium,
            source: RecommendationSource::TechnicalAnalysis,
            confidence: 80,
            potential_impact: 8,
            related_metrics: vec![
                RelatedMetric::new("Technical Signal", 5u8, "Primary indicator"),
                RelatedMetric::new("Buy Indicators", technical.buy_count, "Supporting data"),
            ],
        }),
        TechnicalLabel::StrongSell => Some(Draft {
            title: "Strong Sell Signal from Technical Indicators",
            description: "Multiple technical indicators are aligned suggesting a strong sell opportunity.".into(),
            category: RecommendationCategory::Sell,
            risk_level: RiskLevel::Medium,
            source: RecommendationSource::TechnicalAnalysis,
            confidence: 80,
            potential_impact: 8,
            related_metrics: vec![
                RelatedMetric::new("Technical Signal", 1u8, "Primary indicator"),
                RelatedMetric::new("Sell Indicators", technical.sell_count, "Supporting data"),
            ],
        }),
        _ => None,
    }
}

fn price_action_rule(snapshot: &MarketSnapshot) -> Option<Draft> {
    let pct = snapshot.change_24h_pct;
    let metrics = vec![
        RelatedMetric::new("24h Price Change", pct, "Primary indicator"),
        RelatedMetric::new("Current Price", snapshot.price, "Current value"),
    ];

    if pct <= dec!(-10) {
        Some(Draft {
            title: "Significant Price Drop: Potential Entry Point",
            description: format!(
                "Bitcoin has dropped {:.2}% in the last 24 hours, which may present a buying opportunity for long-term investors.",
                pct.abs()
            ),
            category: RecommendationCategory::Buy,
            risk_level: RiskLevel::High,
            source: RecommendationSource::PriceAction,
            confidence: 65,
            potential_impact: 8,
            related_metrics: metrics,
        })
    } else if pct >= dec!(10) {
        Some(Draft {
            title: "Significant Price Increase: Consider Taking Profits",
            description: format!(
                "Bitcoin has risen {pct:.2}% in the last 24 hours. Consider taking partial profits if you're overexposed."
            ),
            category: RecommendationCategory::Sell,
            risk_level: RiskLevel::Medium,
            source: RecommendationSource::PriceAction,
            confidence: 70,
            potential_impact: 7,
            related_metrics: metrics,
        })
    } else if is_stable_move(pct) {
        Some(Draft {
            title: "Stable Price: Continue Dollar-Cost Averaging",
            description: "Bitcoin price has been relatively stable in the last 24 hours. Consider continuing your regular DCA strategy.".into(),
            category: RecommendationCategory::Dca,
            risk_level: RiskLevel::Low,
            source: RecommendationSource::PriceAction,
            confidence: 75,
            potential_impact: 5,
            related_metrics: metrics,
        })
    } else {
        None
    }
}

/// Whether a 24h move counts as stable enough for DCA
pub fn is_stable_move(change_24h_pct: Decimal) -> bool {
    change_24h_pct.abs() <= dec!(2)
}
