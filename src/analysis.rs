/// Market Analysis Module
///
/// Turns the ranked topic aggregates into a market-wide picture: overall
/// sentiment, hot topics, price-movement guesses and community activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BotError, BotResult};
use crate::trends::{majority, Category, Sentiment, TopicAggregate};
use crate::twitter::Post;

/// Trend strength a topic must exceed to count as hot
pub const HOT_TOPIC_THRESHOLD: i64 = 50;
const MAX_HOT_TOPICS: usize = 5;
const REPORT_TRENDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for MarketSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MarketSentiment::Bullish => "bullish",
            MarketSentiment::Bearish => "bearish",
            MarketSentiment::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Upward,
    Downward,
    Sideways,
}

impl From<Sentiment> for Movement {
    fn from(sentiment: Sentiment) -> Self {
        match sentiment {
            Sentiment::Positive => Movement::Upward,
            Sentiment::Negative => Movement::Downward,
            Sentiment::Neutral => Movement::Sideways,
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Movement::Upward => "upward",
            Movement::Downward => "downward",
            Movement::Sideways => "sideways",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    High,
    Moderate,
    Low,
}

impl ActivityLevel {
    pub fn from_mentions(total_mentions: u64) -> Self {
        if total_mentions > 1000 {
            ActivityLevel::High
        } else if total_mentions < 100 {
            ActivityLevel::Low
        } else {
            ActivityLevel::Moderate
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityLevel::High => "high",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Low => "low",
        };
        f.write_str(label)
    }
}

/// One keyword as seen by the market analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub keyword: String,
    pub mentions: u64,
    pub engagement: u64,
    pub avg_engagement: f64,
    pub sentiment: Sentiment,
    pub category: Category,
    pub posts: Vec<Post>,
    pub trend_strength: i64,
    pub explanation: String,
}

impl From<&TopicAggregate> for TrendAnalysis {
    fn from(topic: &TopicAggregate) -> Self {
        let category = topic.category();
        Self {
            keyword: topic.keyword.clone(),
            mentions: topic.mentions,
            engagement: topic.total_engagement,
            avg_engagement: topic.avg_engagement,
            sentiment: topic.sentiment,
            category,
            posts: topic.posts.clone(),
            trend_strength: topic.trend_strength(),
            explanation: explain_trend(topic, category),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotTopic {
    pub keyword: String,
    pub strength: i64,
    pub sentiment: Sentiment,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMovement {
    pub keyword: String,
    pub sentiment: Sentiment,
    pub strength: i64,
    pub potential_movement: Movement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagingTopic {
    pub keyword: String,
    pub mentions: u64,
    pub avg_engagement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityBuzz {
    pub total_mentions: u64,
    pub total_engagement: u64,
    pub avg_engagement_per_mention: f64,
    pub most_engaging_topic: Option<EngagingTopic>,
    pub community_activity: ActivityLevel,
}

/// Result of one analysis cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub top_trends: Vec<TrendAnalysis>,
    pub market_sentiment: MarketSentiment,
    pub hot_topics: Vec<HotTopic>,
    pub price_movements: Vec<PriceMovement>,
    pub community_buzz: CommunityBuzz,
    pub timestamp: DateTime<Utc>,
}

/// Structured view of the last analysis, as printed by `--report`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub timestamp: DateTime<Utc>,
    pub market_sentiment: MarketSentiment,
    pub top_trends: Vec<TrendAnalysis>,
    pub hot_topics: Vec<HotTopic>,
    pub price_movements: Vec<PriceMovement>,
    pub community_buzz: CommunityBuzz,
    pub insights: Vec<String>,
}

/// Analyze the ranked topics produced by the trend scorer.
///
/// # Errors
/// Returns [`BotError::NoTrends`] when there is nothing to analyze.
pub fn analyze_trends(topics: &[TopicAggregate]) -> BotResult<Analysis> {
    if topics.is_empty() {
        return Err(BotError::NoTrends);
    }

    let top_trends: Vec<TrendAnalysis> = topics.iter().map(TrendAnalysis::from).collect();

    Ok(Analysis {
        market_sentiment: market_sentiment(&top_trends),
        hot_topics: hot_topics(&top_trends),
        price_movements: price_movements(&top_trends),
        community_buzz: community_buzz(&top_trends)?,
        top_trends,
        timestamp: Utc::now(),
    })
}

pub fn market_sentiment(trends: &[TrendAnalysis]) -> MarketSentiment {
    let count = |s: Sentiment| trends.iter().filter(|t| t.sentiment == s).count();
    match majority(
        count(Sentiment::Positive),
        count(Sentiment::Negative),
        count(Sentiment::Neutral),
    ) {
        Sentiment::Positive => MarketSentiment::Bullish,
        Sentiment::Negative => MarketSentiment::Bearish,
        Sentiment::Neutral => MarketSentiment::Neutral,
    }
}

pub fn hot_topics(trends: &[TrendAnalysis]) -> Vec<HotTopic> {
    let mut hot: Vec<&TrendAnalysis> = trends
        .iter()
        .filter(|t| t.trend_strength > HOT_TOPIC_THRESHOLD)
        .collect();
    hot.sort_by(|a, b| b.trend_strength.cmp(&a.trend_strength));

    hot.into_iter()
        .take(MAX_HOT_TOPICS)
        .map(|t| HotTopic {
            keyword: t.keyword.clone(),
            strength: t.trend_strength,
            sentiment: t.sentiment,
            explanation: t.explanation.clone(),
        })
        .collect()
}

pub fn price_movements(trends: &[TrendAnalysis]) -> Vec<PriceMovement> {
    trends
        .iter()
        .filter(|t| {
            matches!(t.category, Category::Trading | Category::Market)
                || ["price", "pump", "dump"]
                    .iter()
                    .any(|w| t.keyword.contains(w))
        })
        .map(|t| PriceMovement {
            keyword: t.keyword.clone(),
            sentiment: t.sentiment,
            strength: t.trend_strength,
            potential_movement: Movement::from(t.sentiment),
        })
        .collect()
}

pub fn community_buzz(trends: &[TrendAnalysis]) -> BotResult<CommunityBuzz> {
    let total_mentions: u64 = trends.iter().map(|t| t.mentions).sum();
    let total_engagement: u64 = trends.iter().map(|t| t.engagement).sum();

    if total_mentions == 0 {
        return Err(BotError::NoTrends);
    }

    // First topic wins ties
    let most_engaging_topic = trends
        .iter()
        .fold(None::<&TrendAnalysis>, |best, t| match best {
            Some(b) if t.avg_engagement <= b.avg_engagement => Some(b),
            _ => Some(t),
        })
        .map(|t| EngagingTopic {
            keyword: t.keyword.clone(),
            mentions: t.mentions,
            avg_engagement: t.avg_engagement,
        });

    Ok(CommunityBuzz {
        total_mentions,
        total_engagement,
        avg_engagement_per_mention: total_engagement as f64 / total_mentions as f64,
        most_engaging_topic,
        community_activity: ActivityLevel::from_mentions(total_mentions),
    })
}

/// Deterministic description of why a keyword is trending
pub fn explain_trend(topic: &TopicAggregate, category: Category) -> String {
    let lead = format!(
        "{} is trending with {} mentions and {} total engagement. ",
        topic.keyword, topic.mentions, topic.total_engagement
    );

    let detail = match (category, topic.sentiment) {
        (Category::Bitcoin, Sentiment::Positive) => {
            "Bitcoin is showing bullish momentum with strong community support."
        }
        (Category::Bitcoin, Sentiment::Negative) => {
            "Bitcoin is facing bearish pressure with negative sentiment."
        }
        (Category::Bitcoin, Sentiment::Neutral) => {
            "Bitcoin discussion is neutral with mixed market opinions."
        }
        (Category::Ethereum, Sentiment::Positive) => {
            "Ethereum is gaining positive attention, possibly due to network upgrades or DeFi activity."
        }
        (Category::Ethereum, Sentiment::Negative) => {
            "Ethereum is experiencing negative sentiment, possibly due to gas fees or network issues."
        }
        (Category::Ethereum, Sentiment::Neutral) => {
            "Ethereum discussion is neutral with balanced market views."
        }
        (Category::Defi, Sentiment::Positive) => {
            "DeFi protocols are attracting positive attention with increased activity."
        }
        (Category::Defi, Sentiment::Negative) => {
            "DeFi sector is facing challenges with negative sentiment."
        }
        (Category::Defi, Sentiment::Neutral) => {
            "DeFi discussion is neutral with mixed protocol performance."
        }
        (Category::Nft, Sentiment::Positive) => {
            "NFT market is showing positive momentum with new projects gaining traction."
        }
        (Category::Nft, Sentiment::Negative) => {
            "NFT market is facing headwinds with declining interest."
        }
        (Category::Nft, Sentiment::Neutral) => {
            "NFT discussion is neutral with varied project performance."
        }
        (Category::Trading, Sentiment::Positive) => {
            "Trading sentiment is bullish with increased buying pressure."
        }
        (Category::Trading, Sentiment::Negative) => {
            "Trading sentiment is bearish with selling pressure."
        }
        (Category::Trading, Sentiment::Neutral) => {
            "Trading discussion is neutral with mixed market signals."
        }
        (_, Sentiment::Positive) => {
            "This crypto topic is generating positive buzz in the community."
        }
        (_, Sentiment::Negative) => "This crypto topic is facing negative sentiment.",
        (_, Sentiment::Neutral) => "This crypto topic has neutral community sentiment.",
    };

    lead + detail
}

/// Short human-readable takeaways for reports
pub fn summary_insights(analysis: &Analysis) -> Vec<String> {
    let mut insights = vec![format!(
        "Market sentiment is {} based on trending topics analysis.",
        analysis.market_sentiment
    )];

    if let Some(top) = analysis.hot_topics.first() {
        insights.push(format!(
            "{} is the hottest topic with {} trend strength.",
            top.keyword, top.strength
        ));
    }

    let upward = analysis
        .price_movements
        .iter()
        .filter(|m| m.sentiment == Sentiment::Positive)
        .count();
    let downward = analysis
        .price_movements
        .iter()
        .filter(|m| m.sentiment == Sentiment::Negative)
        .count();
    if upward > downward {
        insights.push("Price movement indicators suggest upward momentum.".to_string());
    } else if downward > upward {
        insights.push("Price movement indicators suggest downward pressure.".to_string());
    }

    insights.push(format!(
        "Community activity is {} with {} total mentions.",
        analysis.community_buzz.community_activity, analysis.community_buzz.total_mentions
    ));

    insights
}

impl AnalysisReport {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        Self {
            timestamp: analysis.timestamp,
            market_sentiment: analysis.market_sentiment,
            top_trends: analysis.top_trends.iter().take(REPORT_TRENDS).cloned().collect(),
            hot_topics: analysis.hot_topics.clone(),
            price_movements: analysis.price_movements.clone(),
            community_buzz: analysis.community_buzz.clone(),
            insights: summary_insights(analysis),
        }
    }
}
