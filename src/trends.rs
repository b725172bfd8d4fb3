/// Trends Module
///
/// Collects posts for every tracked keyword and rolls them up into ranked
/// per-keyword aggregates with a mention count, engagement totals and a
/// coarse sentiment label.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::twitter::{Post, SearchApi, SearchQuery};

/// Posts kept on each aggregate as examples
pub const SAMPLE_POSTS: usize = 5;

const POSITIVE_TERMS: &[&str] = &[
    "bullish",
    "moon",
    "pump",
    "buy",
    "hodl",
    "diamond hands",
    "to the moon",
];

const NEGATIVE_TERMS: &[&str] = &["bearish", "dump", "sell", "crash", "fud", "panic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// Majority vote that only picks a side when it beats both alternatives
pub fn majority(positive: usize, negative: usize, neutral: usize) -> Sentiment {
    if positive > negative && positive > neutral {
        Sentiment::Positive
    } else if negative > positive && negative > neutral {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Classify a single post by counting listed positive and negative terms
pub fn classify_text(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let positive = POSITIVE_TERMS.iter().filter(|t| text.contains(*t)).count();
    let negative = NEGATIVE_TERMS.iter().filter(|t| text.contains(*t)).count();

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Label a group of posts by majority vote over per-post labels
pub fn classify_posts<'a>(posts: impl IntoIterator<Item = &'a Post>) -> Sentiment {
    let (mut positive, mut negative, mut neutral) = (0, 0, 0);
    for post in posts {
        match classify_text(&post.text) {
            Sentiment::Positive => positive += 1,
            Sentiment::Negative => negative += 1,
            Sentiment::Neutral => neutral += 1,
        }
    }
    majority(positive, negative, neutral)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bitcoin,
    Ethereum,
    Defi,
    Nft,
    Web3,
    Altcoin,
    Trading,
    Market,
    General,
}

/// Checked in order; the first category with a matching substring wins
const CATEGORY_TABLE: &[(Category, &[&str])] = &[
    (Category::Bitcoin, &["bitcoin", "btc", "#bitcoin", "#btc"]),
    (Category::Ethereum, &["ethereum", "eth", "#ethereum", "#eth"]),
    (Category::Defi, &["defi", "decentralized finance", "#defi"]),
    (Category::Nft, &["nft", "non-fungible token", "#nft", "#nfts"]),
    (Category::Web3, &["web3", "web 3.0", "#web3"]),
    (Category::Altcoin, &["altcoin", "alt", "alternative coin"]),
    (Category::Trading, &["trading", "trade", "buy", "sell", "hodl"]),
    (Category::Market, &["bullish", "bearish", "pump", "dump", "moon", "crash"]),
];

impl Category {
    pub fn of_keyword(keyword: &str) -> Self {
        let keyword = keyword.to_lowercase();
        CATEGORY_TABLE
            .iter()
            .find(|(_, terms)| terms.iter().any(|t| keyword.contains(t)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bitcoin => "bitcoin",
            Category::Ethereum => "ethereum",
            Category::Defi => "defi",
            Category::Nft => "nft",
            Category::Web3 => "web3",
            Category::Altcoin => "altcoin",
            Category::Trading => "trading",
            Category::Market => "market",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-keyword rollup of one cycle's posts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAggregate {
    pub keyword: String,
    pub mentions: u64,
    pub total_engagement: u64,
    pub avg_engagement: f64,
    /// At most [`SAMPLE_POSTS`] posts, in fetch order
    pub posts: Vec<Post>,
    pub sentiment: Sentiment,
}

impl TopicAggregate {
    /// Build an aggregate from the posts matching `keyword`.
    ///
    /// Returns `None` for an empty group, which has no defined average.
    pub fn from_posts(keyword: &str, posts: Vec<Post>) -> Option<Self> {
        if posts.is_empty() {
            return None;
        }

        let mentions = posts.len() as u64;
        let total_engagement: u64 = posts.iter().map(|p| p.metrics.engagement()).sum();
        let sentiment = classify_posts(&posts);

        let mut posts = posts;
        posts.truncate(SAMPLE_POSTS);

        Some(Self {
            keyword: keyword.to_lowercase(),
            mentions,
            total_engagement,
            avg_engagement: total_engagement as f64 / mentions as f64,
            posts,
            sentiment,
        })
    }

    pub fn category(&self) -> Category {
        Category::of_keyword(&self.keyword)
    }

    /// Composite score of engagement, mentions and average engagement
    pub fn trend_strength(&self) -> i64 {
        trend_strength(self.total_engagement, self.mentions, self.avg_engagement)
    }
}

pub fn trend_strength(total_engagement: u64, mentions: u64, avg_engagement: f64) -> i64 {
    let engagement_score = (total_engagement as f64 + 1.0).ln();
    let mention_score = (mentions as f64 + 1.0).ln();
    ((engagement_score + mention_score + avg_engagement) / 3.0).round() as i64
}

/// Group posts by lower-cased keyword and rank the groups by total engagement.
///
/// Groups keep first-seen order before the stable sort, so ties stay in fetch
/// order. At most `limit` aggregates are returned.
pub fn rank_topics(posts: Vec<Post>, limit: usize) -> Vec<TopicAggregate> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Post>> = HashMap::new();

    for post in posts {
        let key = post.keyword.to_lowercase();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(post);
    }

    let mut topics: Vec<TopicAggregate> = order
        .into_iter()
        .filter_map(|key| {
            let posts = groups.remove(&key)?;
            TopicAggregate::from_posts(&key, posts)
        })
        .collect();

    topics.sort_by(|a, b| b.total_engagement.cmp(&a.total_engagement));
    topics.truncate(limit);
    topics
}

/// Search every keyword in turn, pausing between calls.
///
/// A failed search is logged and skipped; the remaining keywords are still
/// searched.
pub async fn fetch_posts(
    api: &dyn SearchApi,
    keywords: &[String],
    max_results: u32,
    window_hours: u32,
    delay: Duration,
) -> Vec<Post> {
    let mut posts = Vec::new();

    for (idx, keyword) in keywords.iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let query = SearchQuery::new(keyword, max_results, window_hours);
        match api.search_recent(&query).await {
            Ok(found) => {
                log::debug!("{}: {} posts", keyword, found.len());
                posts.extend(found);
            }
            Err(e) if e.is_rate_limited() => {
                log::warn!("Rate limited while searching {}: {}", keyword, e);
            }
            Err(e) => {
                log::error!("Error searching for {}: {}", keyword, e);
            }
        }
    }

    log::info!(
        "Collected {} posts across {} keywords",
        posts.len(),
        keywords.len()
    );
    posts
}
