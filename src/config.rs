/// Configuration module for managing environment variables and API keys
///
/// This module loads and validates all configuration values from environment
/// variables (typically from a .env file). Missing credentials are fatal at
/// startup; everything else falls back to a default.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

use crate::error::BotError;

/// Keywords searched every cycle unless `CRYPTO_KEYWORDS` overrides them
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "#bitcoin",
    "#btc",
    "#ethereum",
    "#eth",
    "#crypto",
    "#cryptocurrency",
    "#defi",
    "#nft",
    "#web3",
    "#blockchain",
    "#altcoin",
    "#trading",
    "#hodl",
    "#bullish",
    "#bearish",
    "#pump",
    "#dump",
    "#moon",
];

const REQUIRED_VARS: &[&str] = &[
    "TWITTER_API_KEY",
    "TWITTER_API_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_TOKEN_SECRET",
    "TWITTER_BEARER_TOKEN",
    "OPENAI_API_KEY",
];

/// X API credentials. The bearer token is used for search, the OAuth 1.0a
/// user credentials for posting.
#[derive(Debug, Clone)]
pub struct TwitterCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub bearer_token: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub twitter: TwitterCredentials,

    /// OpenAI API key for summary generation
    pub openai_api_key: String,

    /// Chat model used for summaries (e.g., "gpt-3.5-turbo")
    pub gpt_model: String,

    pub bot_username: String,

    /// Cron expression for scheduled posts, with or without a seconds field
    pub posting_schedule: String,

    /// Hard truncation limit for published posts
    pub max_post_length: usize,

    /// Maximum number of ranked keywords kept per cycle
    pub topic_limit: usize,

    /// Lookback window for the keyword searches
    pub analysis_window_hours: u32,

    /// Maximum posts per calendar day
    pub daily_post_cap: u32,

    /// Pause between consecutive keyword searches
    pub api_call_delay_ms: u64,

    /// Result cap passed to each keyword search
    pub search_max_results: u32,

    pub keywords: Vec<String>,

    /// Port for the status HTTP server. The server only runs when set.
    pub http_port: Option<u16>,

    /// Bearer secret protecting `POST /force-post` (optional)
    pub admin_api_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error naming every required variable that is missing
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|name| env::var(name).map(|v| v.trim().is_empty()).unwrap_or(true))
            .collect();

        if !missing.is_empty() {
            return Err(BotError::Config(format!(
                "Missing required environment variables: {}. Set them in the environment or a .env file",
                missing.join(", ")
            ))
            .into());
        }

        let twitter = TwitterCredentials {
            api_key: required("TWITTER_API_KEY")?,
            api_secret: required("TWITTER_API_SECRET")?,
            access_token: required("TWITTER_ACCESS_TOKEN")?,
            access_token_secret: required("TWITTER_ACCESS_TOKEN_SECRET")?,
            bearer_token: required("TWITTER_BEARER_TOKEN")?,
        };

        Ok(Config {
            twitter,

            openai_api_key: required("OPENAI_API_KEY")?,

            gpt_model: env::var("GPT_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),

            bot_username: env::var("BOT_USERNAME")
                .unwrap_or_else(|_| "crypto_trends_bot".to_string()),

            posting_schedule: env::var("POSTING_SCHEDULE")
                .unwrap_or_else(|_| "0 0 */6 * * *".to_string()),

            max_post_length: parsed_or("MAX_TWEET_LENGTH", 280),
            topic_limit: parsed_or("TRENDING_HASHTAGS_LIMIT", 50),
            analysis_window_hours: parsed_or("ANALYSIS_TIME_WINDOW", 24),
            daily_post_cap: parsed_or("TWEET_RATE_LIMIT", 10),
            api_call_delay_ms: parsed_or("API_CALL_DELAY", 1000),
            search_max_results: parsed_or("SEARCH_MAX_RESULTS", 100),

            keywords: env::var("CRYPTO_KEYWORDS")
                .ok()
                .map(|v| parse_keywords(&v))
                .filter(|k| !k.is_empty())
                .unwrap_or_else(default_keywords),

            http_port: env::var("HTTP_PORT").ok().and_then(|v| v.parse().ok()),
            admin_api_secret: env::var("ADMIN_API_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }

    /// Validate settings that would otherwise only fail once the bot is running
    pub fn validate(&self) -> Result<()> {
        log::info!("Validating configuration...");

        let schedule = normalize_cron(&self.posting_schedule);
        cron::Schedule::from_str(&schedule).map_err(|e| BotError::Schedule {
            expression: self.posting_schedule.clone(),
            reason: e.to_string(),
        })?;

        if self.max_post_length <= 3 {
            return Err(BotError::Config("MAX_TWEET_LENGTH must be greater than 3".into()).into());
        }
        if self.daily_post_cap == 0 {
            return Err(BotError::Config("TWEET_RATE_LIMIT must be at least 1".into()).into());
        }
        if self.topic_limit == 0 {
            return Err(
                BotError::Config("TRENDING_HASHTAGS_LIMIT must be at least 1".into()).into(),
            );
        }
        if self.keywords.is_empty() {
            return Err(
                BotError::Config("CRYPTO_KEYWORDS must name at least one keyword".into()).into(),
            );
        }

        log::info!("Configuration validated successfully");
        Ok(())
    }
}

/// Add a seconds field to classic five-field cron expressions
pub fn normalize_cron(expression: &str) -> String {
    let expression = expression.trim();
    if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

fn parsed_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        twitter: TwitterCredentials {
            api_key: "key".into(),
            api_secret: "secret".into(),
            access_token: "token".into(),
            access_token_secret: "token_secret".into(),
            bearer_token: "bearer".into(),
        },
        openai_api_key: "sk-test".into(),
        gpt_model: "gpt-3.5-turbo".into(),
        bot_username: "crypto_trends_bot".into(),
        posting_schedule: "0 */6 * * *".into(),
        max_post_length: 280,
        topic_limit: 50,
        analysis_window_hours: 24,
        daily_post_cap: 2,
        api_call_delay_ms: 0,
        search_max_results: 100,
        keywords: vec!["#bitcoin".into(), "#eth".into()],
        http_port: None,
        admin_api_secret: None,
    }
}
