//! Error Types for the Bitcoin Advisor

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Unexpected response shape: {0}")]
    Parse(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: need ${needed}, have ${available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Insufficient holdings: need {needed} BTC, have {available} BTC")]
    InsufficientHoldings { needed: Decimal, available: Decimal },

    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse failure classes, used to decide how a failure is surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Fetch rejected, timed out or non-2xx. Retried on the next poll.
    NetworkFailure,
    /// Bad user input. Shown once, never retried.
    ValidationFailure,
    /// Upstream answered with an unexpected shape. Replaced by a fallback value.
    ParseFailure,
    Internal,
}

impl AdvisorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Network(e) if e.is_decode() => ErrorClass::ParseFailure,
            Self::Network(_) | Self::UpstreamStatus { .. } => ErrorClass::NetworkFailure,
            Self::Parse(_) => ErrorClass::ParseFailure,
            Self::InvalidAmount(_)
            | Self::InsufficientFunds { .. }
            | Self::InsufficientHoldings { .. }
            | Self::PriceUnavailable(_) => ErrorClass::ValidationFailure,
            Self::Storage(_) | Self::Serialization(_) | Self::Config(_) => ErrorClass::Internal,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::NetworkFailure
    }

    /// Convert to a short message suitable for an inline error or notification
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) | Self::UpstreamStatus { .. } => {
                "Could not load market data. Retrying shortly.".into()
            }
            Self::Parse(_) => "Market data is temporarily unavailable.".into(),
            Self::InvalidAmount(msg) => format!("Invalid amount: {msg}"),
            Self::InsufficientFunds { available, .. } => {
                format!("Insufficient USD balance. Available: ${available:.2}")
            }
            Self::InsufficientHoldings { available, .. } => {
                format!("Insufficient BTC balance. Available: {available} BTC")
            }
            Self::PriceUnavailable(_) => "No current price to execute against.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
