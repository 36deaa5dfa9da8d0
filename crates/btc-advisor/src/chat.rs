//! Canned Chatbot
//!
//! Answers every non-blank message with one of a fixed set of bitcoin
//! talking points. There is no language model behind it.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str = "Hello! I'm your BitChat Assistant. How can I help you with your Bitcoin investment strategy today?";

pub const CANNED_RESPONSES: [&str; 8] = [
    "Bitcoin has been experiencing increased volatility recently due to regulatory news.",
    "The current market sentiment suggests a bullish trend for Bitcoin, but you should always do your own research.",
    "Our AI models predict a potential resistance level around $68,000. It might be a good time to set take-profit orders.",
    "DCA (Dollar Cost Averaging) is often a safer strategy than trying to time the market.",
    "The Bitcoin halving historically has led to price increases in the 12-18 months following the event.",
    "On-chain analysis currently shows strong accumulation from long-term holders.",
    "Consider diversifying your portfolio to manage risk alongside your Bitcoin holdings.",
    "The current hash rate indicates a strong and secure Bitcoin network.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub sender: ChatSender,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: ChatSender::Bot,
            sent_at: Utc::now(),
        }
    }
}

pub struct CannedChatbot {
    rng: Mutex<StdRng>,
}

impl Default for CannedChatbot {
    fn default() -> Self {
        Self::new()
    }
}

impl CannedChatbot {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn welcome(&self) -> ChatMessage {
        ChatMessage::bot(WELCOME_MESSAGE)
    }

    /// Reply to `input`, or `None` when it is blank
    pub fn reply(&self, input: &str) -> Option<ChatMessage> {
        if input.trim().is_empty() {
            return None;
        }

        let idx = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..CANNED_RESPONSES.len());
        Some(ChatMessage::bot(CANNED_RESPONSES[idx]))
    }
}
