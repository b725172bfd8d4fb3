/// Twitter Module
///
/// Talks to the X (Twitter) API v2: recent search for the keyword scrape and
/// tweet creation for publishing. Both endpoints sit behind small traits so
/// the orchestrator can be driven by in-memory fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TwitterCredentials;
use crate::error::{BotError, BotResult};
use crate::oauth::{self, OAuthNonce};

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";

/// Recent search only covers the last seven days
const MAX_LOOKBACK_HOURS: i64 = 7 * 24 - 1;

/// Engagement counters reported for a post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
}

impl PostMetrics {
    pub fn engagement(&self) -> u64 {
        self.likes + self.retweets + self.replies
    }
}

/// A post returned by a keyword search, tagged with the keyword that matched it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub keyword: String,
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub metrics: PostMetrics,
    pub author_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub keyword: String,
    pub max_results: u32,
    pub start_time: Option<DateTime<Utc>>,
}

impl SearchQuery {
    /// Build a query looking back `window_hours`, clamped to what recent search allows
    pub fn new(keyword: &str, max_results: u32, window_hours: u32) -> Self {
        let hours = i64::from(window_hours).clamp(1, MAX_LOOKBACK_HOURS);
        Self {
            keyword: keyword.to_string(),
            max_results: max_results.clamp(10, 100),
            start_time: Some(Utc::now() - ChronoDuration::hours(hours)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: String,
    pub text: String,
}

/// Keyword search against the social-media API
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search_recent(&self, query: &SearchQuery) -> BotResult<Vec<Post>>;
}

/// Publishing on behalf of the bot account
#[async_trait]
pub trait PostingApi: Send + Sync {
    async fn post_tweet(&self, text: &str) -> BotResult<PublishedPost>;
}

#[derive(Debug, Deserialize)]
struct TwitterTweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<String>,
    public_metrics: Option<TwitterMetrics>,
}

#[derive(Debug, Deserialize)]
struct TwitterMetrics {
    like_count: Option<u64>,
    retweet_count: Option<u64>,
    reply_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TwitterSearchResponse {
    data: Option<Vec<TwitterTweet>>,
    meta: Option<TwitterMeta>,
}

#[derive(Debug, Deserialize)]
struct TwitterMeta {
    result_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: PublishedPost,
}

impl TwitterTweet {
    fn into_post(self, keyword: &str) -> Post {
        let metrics = self
            .public_metrics
            .map(|m| PostMetrics {
                likes: m.like_count.unwrap_or(0),
                retweets: m.retweet_count.unwrap_or(0),
                replies: m.reply_count.unwrap_or(0),
            })
            .unwrap_or_default();

        let created_at = self
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));

        Post {
            keyword: keyword.to_string(),
            id: self.id,
            text: self.text,
            created_at,
            metrics,
            author_id: self.author_id,
        }
    }
}

/// HTTP client for the X API v2
pub struct TwitterClient {
    credentials: TwitterCredentials,
    http_client: reqwest::Client,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials) -> BotResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            credentials,
            http_client,
        })
    }
}

#[async_trait]
impl SearchApi for TwitterClient {
    /// Uses Bearer Token authentication (app-only)
    async fn search_recent(&self, query: &SearchQuery) -> BotResult<Vec<Post>> {
        log::debug!(
            "Searching recent tweets for {} (max: {})",
            query.keyword,
            query.max_results
        );

        let max_results = query.max_results.to_string();
        let mut params = vec![
            ("query", query.keyword.clone()),
            ("max_results", max_results),
            ("tweet.fields", "created_at,author_id,public_metrics".to_string()),
        ];
        if let Some(start) = query.start_time {
            params.push(("start_time", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }

        let response = self
            .http_client
            .get(SEARCH_URL)
            .header(
                "Authorization",
                format!("Bearer {}", self.credentials.bearer_token.trim()),
            )
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let (remaining, reset_at) = rate_limit_info(response.headers());

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error("search", status.as_u16(), text, reset_at));
        }

        if let Some(remaining) = remaining {
            log::debug!("Search rate limit: {} requests remaining", remaining);
            if remaining < 5 {
                log::warn!("⚠️  Low search rate limit remaining ({})", remaining);
            }
        }

        let body: TwitterSearchResponse = response.json().await?;
        let count = body.meta.and_then(|m| m.result_count).unwrap_or(0);
        log::debug!("{} returned {} tweets", query.keyword, count);

        Ok(body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.into_post(&query.keyword))
            .collect())
    }
}

#[async_trait]
impl PostingApi for TwitterClient {
    /// Uses OAuth 1.0a user context so the tweet is attributed to the bot account
    async fn post_tweet(&self, text: &str) -> BotResult<PublishedPost> {
        let header = oauth::authorization_header(
            &self.credentials,
            "POST",
            TWEETS_URL,
            &[],
            &OAuthNonce::generate(),
        )?;

        let response = self
            .http_client
            .post(TWEETS_URL)
            .header("Authorization", header)
            .json(&CreateTweetRequest { text })
            .send()
            .await?;

        let status = response.status();
        let (_, reset_at) = rate_limit_info(response.headers());

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error("post", status.as_u16(), text, reset_at));
        }

        let created: CreateTweetResponse = response.json().await?;
        log::info!("Tweet posted successfully: {}", created.data.id);
        Ok(created.data)
    }
}

fn rate_limit_info(headers: &HeaderMap) -> (Option<u32>, Option<DateTime<Utc>>) {
    let remaining = headers
        .get("x-rate-limit-remaining")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u32>().ok());

    let reset_at = headers
        .get("x-rate-limit-reset")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));

    (remaining, reset_at)
}

/// Map a non-success response to an error with a helpful message
fn api_error(
    operation: &'static str,
    status: u16,
    body: String,
    reset_at: Option<DateTime<Utc>>,
) -> BotError {
    let message = match status {
        401 => format!(
            "Unauthorized: invalid or expired credentials for {}. API Response: {}",
            operation, body
        ),
        403 => format!(
            "Forbidden: the app lacks access to this endpoint or the content was rejected. API Response: {}",
            body
        ),
        429 => {
            return BotError::RateLimited {
                service: "twitter",
                reset_at,
            }
        }
        _ => body,
    };

    BotError::Api {
        service: "twitter",
        status,
        message,
    }
}
