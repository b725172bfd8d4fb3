/// Text generation module
///
/// This module handles:
/// - Chat completion requests against the OpenAI API
/// - Prompt building from a market analysis
/// - A deterministic template used whenever generation fails

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analysis::{Analysis, MarketSentiment};
use crate::error::{BotError, BotResult};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a cryptocurrency market analyst who creates engaging, \
informative summaries of crypto trends for Twitter. Write in English, be concise but informative, \
and use emojis appropriately.";

/// Represents a message in a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system", "user" or "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Anything that can turn a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> BotResult<String>;
}

/// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChatChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatChoice {
    message: ChatMessage,
}

pub struct OpenAIClient {
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> BotResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key,
            model,
            http_client,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAIClient {
    async fn generate(&self, request: GenerationRequest) -> BotResult<String> {
        log::info!("Generating text using {}", self.model);

        let body = OpenAIChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http_client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(BotError::Api {
                service: "openai",
                status: status.as_u16(),
                message: error_text,
            });
        }

        let response: OpenAIChatResponse = response.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| BotError::Generation("No response from GPT".to_string()))
    }
}

/// Build the user prompt for a trends summary
pub fn build_trends_summary_prompt(analysis: &Analysis) -> String {
    let top_trends = analysis
        .top_trends
        .iter()
        .take(5)
        .map(|t| {
            format!(
                "- {}: {} mentions, {} sentiment, {} strength",
                t.keyword, t.mentions, t.sentiment, t.trend_strength
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let hot_topics = analysis
        .hot_topics
        .iter()
        .map(|t| format!("- {} (strength: {})", t.keyword, t.strength))
        .collect::<Vec<_>>()
        .join("\n");

    let movements = analysis
        .price_movements
        .iter()
        .map(|m| {
            format!(
                "- {}: {} ({})",
                m.keyword, m.potential_movement, m.sentiment
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze these crypto trends and create a Twitter-friendly summary:\n\
        \n\
        Market Sentiment: {}\n\
        Community Activity: {}\n\
        Total Mentions: {}\n\
        \n\
        Top Trends:\n\
        {}\n\
        \n\
        Hot Topics:\n\
        {}\n\
        \n\
        Price Movement Indicators:\n\
        {}\n\
        \n\
        Create a concise summary that explains what's happening in crypto markets right now. \
        Include emojis and make it engaging for Twitter users.",
        analysis.market_sentiment,
        analysis.community_buzz.community_activity,
        analysis.community_buzz.total_mentions,
        top_trends,
        hot_topics,
        movements
    )
}

/// Ask the generator for a summary, falling back to the template on any failure
pub async fn generate_trends_summary(generator: &dyn TextGenerator, analysis: &Analysis) -> String {
    let request = GenerationRequest {
        messages: vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(build_trends_summary_prompt(analysis)),
        ],
        max_tokens: 500,
        temperature: 0.7,
    };

    match generator.generate(request).await {
        Ok(summary) => summary,
        Err(e) => {
            log::warn!("Summary generation failed, using template: {}", e);
            fallback_summary(analysis)
        }
    }
}

fn sentiment_marker(sentiment: MarketSentiment) -> &'static str {
    match sentiment {
        MarketSentiment::Bullish => "🟢 Bullish",
        MarketSentiment::Bearish => "🔴 Bearish",
        MarketSentiment::Neutral => "🟡 Neutral",
    }
}

/// Deterministic post body built only from the analysis
pub fn fallback_summary(analysis: &Analysis) -> String {
    let mut content = String::from("📊 Crypto Market Update 📊\n\n");
    content.push_str(&format!(
        "Market Sentiment: {}\n\n",
        sentiment_marker(analysis.market_sentiment)
    ));

    if let Some(top) = analysis.top_trends.first() {
        content.push_str(&format!("Top Trend: {}\n", top.keyword));
        content.push_str(&format!("Mentions: {}\n", top.mentions));
        content.push_str(&format!("Sentiment: {}\n\n", top.sentiment));
    }

    content.push_str(&format!(
        "Community Activity: {}\n",
        analysis.community_buzz.community_activity
    ));
    content.push_str(&format!(
        "Total Mentions: {}\n\n",
        analysis.community_buzz.total_mentions
    ));
    content.push_str("Stay informed about crypto trends!");

    content
}
