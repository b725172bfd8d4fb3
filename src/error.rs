/// Error types shared across the bot
///
/// External API failures, degenerate input and scheduling problems are
/// distinguished so the orchestrator can decide whether to skip a keyword,
/// abort a cycle, or halt at startup.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {service}{}", reset_suffix(reset_at))]
    RateLimited {
        service: &'static str,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("No trending topics to analyze")]
    NoTrends,

    #[error("Daily post cap of {cap} reached")]
    DailyCapReached { cap: u32 },

    #[error("Invalid schedule '{expression}': {reason}")]
    Schedule { expression: String, reason: String },
}

impl BotError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BotError::RateLimited { .. })
    }
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    reset_at
        .map(|t| format!(", resets at {}", t.format("%Y-%m-%d %H:%M:%S UTC")))
        .unwrap_or_default()
}

pub type BotResult<T> = std::result::Result<T, BotError>;
