//! Analysis Narrative
//!
//! Four-paragraph market commentary assembled from templates.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::model::{MarketSnapshot, RiskProfile, SentimentIndex, TechnicalLabel, TechnicalScore};

pub const FALLBACK_NARRATIVE: &str = "Unable to generate analysis due to insufficient data.";

/// Market condition used to pick strategy advice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Condition {
    /// Fearful sentiment confirmed by a strong buy
    FearWithStrongBuy,
    /// Greedy sentiment confirmed by a strong sell
    GreedWithStrongSell,
    Other,
}

impl Condition {
    fn of(sentiment: &SentimentIndex, technical: &TechnicalScore) -> Self {
        match technical.label {
            TechnicalLabel::StrongBuy if sentiment.value <= 30 => Self::FearWithStrongBuy,
            TechnicalLabel::StrongSell if sentiment.value >= 70 => Self::GreedWithStrongSell,
            _ => Self::Other,
        }
    }
}

fn strategy_advice(profile: RiskProfile, condition: Condition) -> &'static str {
    match (profile, condition) {
        (RiskProfile::Conservative, Condition::FearWithStrongBuy) => {
            "consider a modest increase in your DCA amount (5-10%) to take advantage of current conditions while maintaining your conservative approach."
        }
        (RiskProfile::Conservative, Condition::GreedWithStrongSell) => {
            "consider slightly reducing exposure or setting aside some funds for potential future buying opportunities."
        }
        (RiskProfile::Conservative, Condition::Other) => {
            "maintain your regular DCA schedule and conservative allocation strategy."
        }
        (RiskProfile::Moderate, Condition::FearWithStrongBuy) => {
            "consider increasing your bitcoin allocation by 10-15% to capitalize on the current market sentiment and technical signals."
        }
        (RiskProfile::Moderate, Condition::GreedWithStrongSell) => {
            "consider taking some profits (10-15% of position) while maintaining your core holdings."
        }
        (RiskProfile::Moderate, Condition::Other) => {
            "continue your balanced approach with regular investments and periodic rebalancing."
        }
        (RiskProfile::Aggressive, Condition::FearWithStrongBuy) => {
            "consider a significant position increase (15-25%) as current conditions align with an aggressive buying opportunity."
        }
        (RiskProfile::Aggressive, Condition::GreedWithStrongSell) => {
            "consider taking partial profits while preparing for potential high-volatility trading opportunities in the near future."
        }
        (RiskProfile::Aggressive, Condition::Other) => {
            "maintain your aggressive stance but watch technical indicators closely for short-term trading opportunities."
        }
    }
}

fn sentiment_description(value: u8) -> &'static str {
    match value {
        0..=25 => "extremely fearful, which has historically presented buying opportunities",
        26..=40 => "fearful, suggesting potential value entry points",
        41..=60 => "neutral, indicating a balanced market",
        61..=75 => "greedy, suggesting caution may be warranted",
        _ => "extremely greedy, which has historically preceded corrections",
    }
}

/// Compose the narrative. Inputs are assumed validated.
pub fn compose(
    snapshot: &MarketSnapshot,
    sentiment: &SentimentIndex,
    technical: &TechnicalScore,
    profile: RiskProfile,
) -> String {
    let pct = snapshot.change_24h_pct;
    let direction = if pct >= Decimal::ZERO { "upward" } else { "downward" };
    let magnitude = if pct.abs() > dec!(5) { "significant" } else { "moderate" };
    let outlook = if sentiment.value < 50 {
        "potentially favorable"
    } else {
        "cautiously optimistic"
    };
    let advice = strategy_advice(profile, Condition::of(sentiment, technical));

    let trend = format!(
        "Market Analysis: Bitcoin is showing a {magnitude} {direction} trend at ${}, with a {pct:.2}% change in the last 24 hours.",
        format_price(snapshot.price)
    );
    let mood = format!(
        "Market Sentiment: The Fear & Greed Index reads {} ({}). Market sentiment is {}, while technical indicators are giving a {} signal.",
        sentiment.value,
        sentiment.label,
        sentiment_description(sentiment.value),
        technical.label
    );
    let strategy = format!("Strategy Recommendation: Based on your {profile} risk profile, {advice}");
    let levels = format!(
        "Outlook: The combination of {} market sentiment and {} technical signals suggests a {outlook} short-term outlook for bitcoin. Key resistance levels to watch are ${} and ${}, with support at ${}.",
        sentiment.label.as_str().to_lowercase(),
        technical.label,
        whole_dollars(snapshot.price * dec!(1.05)),
        whole_dollars(snapshot.price * dec!(1.10)),
        whole_dollars(snapshot.price * dec!(0.95)),
    );

    [trend, mood, strategy, levels].join("\n\n")
}

fn whole_dollars(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Price the way a browser localizes a number: grouped, at most three
/// decimals, no trailing zeros (`61,250.5`, `60,000`)
pub fn format_price(amount: Decimal) -> String {
    let amount = amount
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format_usd(amount, amount.scale())
}

/// Format with thousands separators, e.g. `61,250.50`
pub fn format_usd(amount: Decimal, decimals: u32) -> String {
    let rounded = amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", decimals as usize, rounded.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(text.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.insert(0, '-');
    }
    grouped
}
