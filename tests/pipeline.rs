use async_trait::async_trait;
use crypto_trends_bot::analysis::MarketSentiment;
use crypto_trends_bot::bot::{CycleOutcome, TrendsBot};
use crypto_trends_bot::config::{Config, TwitterCredentials};
use crypto_trends_bot::error::{BotError, BotResult};
use crypto_trends_bot::generation::{GenerationRequest, TextGenerator};
use crypto_trends_bot::twitter::{
    Post, PostMetrics, PostingApi, PublishedPost, SearchApi, SearchQuery,
};
use std::sync::{Arc, Mutex};

struct CannedSearch;

fn post(keyword: &str, id: &str, text: &str, likes: u64) -> Post {
    Post {
        keyword: keyword.to_string(),
        id: id.to_string(),
        text: text.to_string(),
        created_at: None,
        metrics: PostMetrics {
            likes,
            retweets: 0,
            replies: 0,
        },
        author_id: None,
    }
}

#[async_trait]
impl SearchApi for CannedSearch {
    async fn search_recent(&self, query: &SearchQuery) -> BotResult<Vec<Post>> {
        match query.keyword.as_str() {
            "#bitcoin" => Ok(vec![
                post("#bitcoin", "1", "BTC to the moon", 50),
                post("#bitcoin", "2", "bullish breakout", 50),
            ]),
            "#dump" => Ok(vec![post("#dump", "3", "panic sell, this is a crash", 1)]),
            _ => Err(BotError::RateLimited {
                service: "twitter",
                reset_at: None,
            }),
        }
    }
}

#[derive(Default)]
struct RecordingPosting {
    posted: Mutex<Vec<String>>,
}

#[async_trait]
impl PostingApi for RecordingPosting {
    async fn post_tweet(&self, text: &str) -> BotResult<PublishedPost> {
        let mut posted = self.posted.lock().unwrap();
        posted.push(text.to_string());
        Ok(PublishedPost {
            id: format!("tweet-{}", posted.len()),
            text: text.to_string(),
        })
    }
}

struct StaticGenerator(Option<&'static str>);

#[async_trait]
impl TextGenerator for StaticGenerator {
    async fn generate(&self, _request: GenerationRequest) -> BotResult<String> {
        self.0
            .map(str::to_string)
            .ok_or_else(|| BotError::Generation("model unavailable".into()))
    }
}

fn config() -> Config {
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
        posting_schedule: "0 0 */6 * * *".into(),
        max_post_length: 280,
        topic_limit: 50,
        analysis_window_hours: 24,
        daily_post_cap: 1,
        api_call_delay_ms: 0,
        search_max_results: 100,
        keywords: vec!["#bitcoin".into(), "#solana".into(), "#dump".into()],
        http_port: None,
        admin_api_secret: None,
    }
}

fn bot(posting: Arc<RecordingPosting>, reply: Option<&'static str>) -> TrendsBot {
    TrendsBot::new(
        config(),
        Arc::new(CannedSearch),
        posting,
        Arc::new(StaticGenerator(reply)),
    )
}

#[tokio::test]
async fn test_full_cycle_publishes_summary_with_hashtags() {
    let posting = Arc::new(RecordingPosting::default());
    let bot = bot(posting.clone(), Some("Markets are mixed today."));

    let outcome = bot.force_post().await.unwrap();

    let expected = "Markets are mixed today.\n\n\
        #CryptoAnalysis #CryptoTrends #Neutral #CryptoMarket #bitcoin #dump #Bitcoin #BTC";
    assert_eq!(
        outcome,
        CycleOutcome::Published(PublishedPost {
            id: "tweet-1".into(),
            text: expected.into(),
        })
    );
    assert_eq!(posting.posted.lock().unwrap().as_slice(), [expected]);
}

#[tokio::test]
async fn test_report_reflects_last_analysis() {
    let posting = Arc::new(RecordingPosting::default());
    let bot = bot(posting.clone(), Some("gm"));

    assert!(bot.analysis_report().await.is_none());
    bot.run_analysis().await.unwrap();

    let report = bot.analysis_report().await.unwrap();
    assert_eq!(report.market_sentiment, MarketSentiment::Neutral);
    assert_eq!(report.top_trends.len(), 2);
    assert_eq!(report.top_trends[0].keyword, "#bitcoin");
    assert_eq!(report.top_trends[0].mentions, 2);
    assert_eq!(report.community_buzz.total_mentions, 3);
    assert_eq!(report.price_movements.len(), 1);
    assert_eq!(report.price_movements[0].keyword, "#dump");
    assert!(!report.insights.is_empty());

    // analysis alone never posts
    assert!(posting.posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_template_used_when_generation_fails() {
    let posting = Arc::new(RecordingPosting::default());
    let bot = bot(posting.clone(), None);

    bot.force_post().await.unwrap();

    let posted = posting.posted.lock().unwrap();
    assert!(posted[0].starts_with("📊 Crypto Market Update 📊"));
    assert!(posted[0].contains("Top Trend: #bitcoin"));
    assert!(posted[0].chars().count() <= 280);
}

#[tokio::test]
async fn test_daily_cap_survives_restart_of_schedule() {
    let posting = Arc::new(RecordingPosting::default());
    let bot = bot(posting.clone(), Some("gm"));

    bot.start().await;
    bot.scheduled_tick().await;
    assert_eq!(bot.force_post().await.unwrap(), CycleOutcome::CapReached);
    assert_eq!(posting.posted.lock().unwrap().len(), 1);

    bot.reset_daily_counter().await;
    assert!(matches!(
        bot.force_post().await.unwrap(),
        CycleOutcome::Published(_)
    ));

    let status = bot.status().await;
    assert!(status.is_running);
    assert_eq!(status.post_count, 1);
    assert_eq!(status.max_posts_per_day, 1);
}
