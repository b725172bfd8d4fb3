/// Bot orchestration module
///
/// Owns the process-lifetime state (running flag, daily post counter, last
/// analysis) and runs the fetch → score → summarize → compose → publish
/// cycle. Cycles are serialised through an owned lock, so scheduled ticks and
/// manual triggers never overlap.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::analysis::{analyze_trends, Analysis, AnalysisReport};
use crate::composer::{compose_post, truncate_with_ellipsis};
use crate::config::{normalize_cron, Config};
use crate::error::{BotError, BotResult};
use crate::generation::{OpenAIClient, TextGenerator};
use crate::trends::{fetch_posts, rank_topics};
use crate::twitter::{PostingApi, PublishedPost, SearchApi, TwitterClient};

#[derive(Debug, Default)]
struct BotState {
    running: bool,
    post_count: u32,
    last_analysis: Option<Analysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotStatus {
    pub is_running: bool,
    pub post_count: u32,
    pub max_posts_per_day: u32,
    pub last_analysis: Option<DateTime<Utc>>,
    pub next_post_time: Option<DateTime<Utc>>,
}

/// How a cycle ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published(PublishedPost),
    NoTopics,
    CapReached,
}

pub struct TrendsBot {
    config: Config,
    search: Arc<dyn SearchApi>,
    posting: Arc<dyn PostingApi>,
    generator: Arc<dyn TextGenerator>,
    state: RwLock<BotState>,
    cycle_lock: Mutex<()>,
}

impl TrendsBot {
    pub fn new(
        config: Config,
        search: Arc<dyn SearchApi>,
        posting: Arc<dyn PostingApi>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config,
            search,
            posting,
            generator,
            state: RwLock::new(BotState::default()),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Build a bot talking to the real X and OpenAI APIs
    pub fn from_config(config: Config) -> Result<Self> {
        let twitter = Arc::new(
            TwitterClient::new(config.twitter.clone())
                .context("Failed to create Twitter client")?,
        );
        let generator = Arc::new(
            OpenAIClient::new(config.openai_api_key.clone(), config.gpt_model.clone())
                .context("Failed to create OpenAI client")?,
        );

        Ok(Self::new(config, twitter.clone(), twitter, generator))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mark the bot as running and perform the initial cycle
    pub async fn start(&self) {
        log::info!("🚀 Starting crypto trends bot...");
        for line in self.startup_summary() {
            log::info!("{}", line);
        }
        self.state.write().await.running = true;
        self.scheduled_tick().await;
    }

    /// Settings worth knowing at startup, one log line each
    pub fn startup_summary(&self) -> Vec<String> {
        vec![
            format!("🤖 Bot username: @{}", self.config.bot_username),
            format!(
                "📅 Posting schedule: {}",
                normalize_cron(&self.config.posting_schedule)
            ),
            format!("📊 Max posts per day: {}", self.config.daily_post_cap),
            format!(
                "⏰ Analysis window: {} hours",
                self.config.analysis_window_hours
            ),
        ]
    }

    /// Prevent new scheduled cycles; an in-flight cycle runs to completion
    pub async fn stop(&self) {
        log::info!("🛑 Stopping crypto trends bot...");
        self.state.write().await.running = false;
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }

    /// Entry point for the posting schedule. Never returns an error: failures
    /// are logged and the cycle is abandoned.
    pub async fn scheduled_tick(&self) {
        {
            let state = self.state.read().await;
            if !state.running {
                log::debug!("Bot is stopped, skipping scheduled cycle");
                return;
            }
            if state.post_count >= self.config.daily_post_cap {
                log::info!(
                    "Daily post cap reached ({}/{}), skipping scheduled cycle",
                    state.post_count,
                    self.config.daily_post_cap
                );
                return;
            }
        }

        log::info!("⏰ Scheduled cycle triggered");
        match self.run_cycle().await {
            Ok(outcome) => log::debug!("Scheduled cycle finished: {:?}", outcome),
            Err(e) if e.is_rate_limited() => {
                log::warn!(
                    "Rate limit hit during cycle, will try again at the next tick: {}",
                    e
                );
            }
            Err(e) => log::error!("❌ Error in analysis and post: {}", e),
        }
    }

    /// Run one full cycle immediately, regardless of the running flag
    pub async fn force_post(&self) -> BotResult<CycleOutcome> {
        log::info!("🔄 Manual post triggered");
        self.run_cycle().await
    }

    /// fetch → score → summarize → compose → publish
    pub async fn run_cycle(&self) -> BotResult<CycleOutcome> {
        let _cycle = self.cycle_lock.lock().await;

        let analysis = match self.analyze().await? {
            Some(analysis) => analysis,
            None => return Ok(CycleOutcome::NoTopics),
        };

        if self.post_count().await >= self.config.daily_post_cap {
            log::warn!("Daily post cap reached, analysis kept but nothing published");
            return Ok(CycleOutcome::CapReached);
        }

        let content = compose_post(
            self.generator.as_ref(),
            &analysis,
            self.config.max_post_length,
        )
        .await;

        let published = self.publish(&content).await?;
        let count = self.post_count().await;
        log::info!(
            "✅ Posted successfully! ({}/{} today)",
            count,
            self.config.daily_post_cap
        );
        log::debug!("Content: {}", published.text);

        Ok(CycleOutcome::Published(published))
    }

    /// fetch → score → summarize without publishing; updates the last analysis
    pub async fn run_analysis(&self) -> BotResult<Option<Analysis>> {
        let _cycle = self.cycle_lock.lock().await;
        self.analyze().await
    }

    async fn analyze(&self) -> BotResult<Option<Analysis>> {
        log::info!("🔍 Analyzing crypto trends...");

        let posts = fetch_posts(
            self.search.as_ref(),
            &self.config.keywords,
            self.config.search_max_results,
            self.config.analysis_window_hours,
            Duration::from_millis(self.config.api_call_delay_ms),
        )
        .await;

        let topics = rank_topics(posts, self.config.topic_limit);
        if topics.is_empty() {
            log::warn!("⚠️ No trending topics found");
            return Ok(None);
        }

        let analysis = analyze_trends(&topics)?;
        log::info!(
            "Analyzed {} topics, market sentiment {}",
            analysis.top_trends.len(),
            analysis.market_sentiment
        );

        self.state.write().await.last_analysis = Some(analysis.clone());
        Ok(Some(analysis))
    }

    /// Publish text, enforcing the length limit and the daily cap
    pub async fn publish(&self, text: &str) -> BotResult<PublishedPost> {
        {
            // Reserve the slot before the API call; released again on failure
            let mut state = self.state.write().await;
            if state.post_count >= self.config.daily_post_cap {
                return Err(BotError::DailyCapReached {
                    cap: self.config.daily_post_cap,
                });
            }
            state.post_count += 1;
        }

        let text = truncate_with_ellipsis(text, self.config.max_post_length);
        match self.posting.post_tweet(&text).await {
            Ok(published) => Ok(published),
            Err(e) => {
                let mut state = self.state.write().await;
                state.post_count = state.post_count.saturating_sub(1);
                Err(e)
            }
        }
    }

    pub async fn post_count(&self) -> u32 {
        self.state.read().await.post_count
    }

    pub async fn reset_daily_counter(&self) {
        self.state.write().await.post_count = 0;
        log::info!("🔄 Daily post counter reset");
    }

    pub async fn status(&self) -> BotStatus {
        let state = self.state.read().await;
        BotStatus {
            is_running: state.running,
            post_count: state.post_count,
            max_posts_per_day: self.config.daily_post_cap,
            last_analysis: state.last_analysis.as_ref().map(|a| a.timestamp),
            next_post_time: self.next_post_time(),
        }
    }

    /// Report for the last completed analysis, if any
    pub async fn analysis_report(&self) -> Option<AnalysisReport> {
        self.state
            .read()
            .await
            .last_analysis
            .as_ref()
            .map(AnalysisReport::from_analysis)
    }

    fn next_post_time(&self) -> Option<DateTime<Utc>> {
        let expression = normalize_cron(&self.config.posting_schedule);
        cron::Schedule::from_str(&expression)
            .ok()
            .and_then(|schedule| schedule.upcoming(Utc).next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::generation::tests::FakeGenerator;
    use crate::trends::tests::FakeSearch;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct FakePosting {
        posted: StdMutex<Vec<String>>,
        fail: bool,
    }

    impl FakePosting {
        fn new(fail: bool) -> Self {
            Self {
                posted: StdMutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl PostingApi for FakePosting {
        async fn post_tweet(&self, text: &str) -> BotResult<PublishedPost> {
            if self.fail {
                return Err(BotError::Api {
                    service: "twitter",
                    status: 403,
                    message: "duplicate content".into(),
                });
            }
            let mut posted = self.posted.lock().unwrap();
            posted.push(text.to_string());
            Ok(PublishedPost {
                id: posted.len().to_string(),
                text: text.to_string(),
            })
        }
    }

    fn bot_with(
        search: FakeSearch,
        posting: Arc<FakePosting>,
        generator: FakeGenerator,
    ) -> TrendsBot {
        TrendsBot::new(test_config(), Arc::new(search), posting, Arc::new(generator))
    }

    fn working_search() -> FakeSearch {
        FakeSearch {
            calls: StdMutex::new(Vec::new()),
            failing: Vec::new(),
        }
    }

    #[tokio::test]
    async fn cycle_publishes_and_counts() {
        let posting = Arc::new(FakePosting::new(false));
        let bot = bot_with(working_search(), posting.clone(), FakeGenerator::replying("gm"));

        let outcome = bot.force_post().await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Published(_)));
        assert_eq!(bot.post_count().await, 1);
        assert_eq!(posting.posted.lock().unwrap().len(), 1);
        assert!(bot.analysis_report().await.is_some());
    }

    #[tokio::test]
    async fn scheduled_ticks_stop_at_daily_cap() {
        let posting = Arc::new(FakePosting::new(false));
        let bot = bot_with(working_search(), posting.clone(), FakeGenerator::replying("gm"));

        // start performs the first cycle
        bot.start().await;
        bot.scheduled_tick().await;
        bot.scheduled_tick().await;
        bot.scheduled_tick().await;

        assert_eq!(bot.post_count().await, 2);
        assert_eq!(posting.posted.lock().unwrap().len(), 2);

        bot.reset_daily_counter().await;
        bot.scheduled_tick().await;
        assert_eq!(posting.posted.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn forced_cycle_respects_cap() {
        let posting = Arc::new(FakePosting::new(false));
        let bot = bot_with(working_search(), posting.clone(), FakeGenerator::replying("gm"));

        bot.force_post().await.unwrap();
        bot.force_post().await.unwrap();
        let outcome = bot.force_post().await.unwrap();

        assert_eq!(outcome, CycleOutcome::CapReached);
        assert_eq!(posting.posted.lock().unwrap().len(), 2);
        assert!(matches!(
            bot.publish("extra").await,
            Err(BotError::DailyCapReached { cap: 2 })
        ));
    }

    #[tokio::test]
    async fn stopped_bot_skips_scheduled_cycles() {
        let search = working_search();
        let posting = Arc::new(FakePosting::new(false));
        let bot = bot_with(search, posting.clone(), FakeGenerator::replying("gm"));

        bot.scheduled_tick().await;
        assert!(posting.posted.lock().unwrap().is_empty());

        bot.start().await;
        bot.stop().await;
        bot.scheduled_tick().await;
        assert_eq!(posting.posted.lock().unwrap().len(), 1);
        assert!(!bot.is_running().await);
    }

    #[tokio::test]
    async fn publish_failure_keeps_counter() {
        let posting = Arc::new(FakePosting::new(true));
        let bot = bot_with(working_search(), posting, FakeGenerator::replying("gm"));

        let result = bot.force_post().await;

        assert!(matches!(result, Err(BotError::Api { status: 403, .. })));
        assert_eq!(bot.post_count().await, 0);
        // the analysis survives the failed publish
        assert!(bot.analysis_report().await.is_some());
    }

    #[tokio::test]
    async fn no_topics_is_a_no_op() {
        let search = FakeSearch {
            calls: StdMutex::new(Vec::new()),
            failing: vec!["#bitcoin".into(), "#eth".into()],
        };
        let posting = Arc::new(FakePosting::new(false));
        let bot = bot_with(search, posting.clone(), FakeGenerator::replying("gm"));

        assert_eq!(bot.force_post().await.unwrap(), CycleOutcome::NoTopics);
        assert!(posting.posted.lock().unwrap().is_empty());
        assert!(bot.analysis_report().await.is_none());
    }

    #[tokio::test]
    async fn long_text_is_truncated_before_posting() {
        let posting = Arc::new(FakePosting::new(false));
        let bot = bot_with(working_search(), posting.clone(), FakeGenerator::replying("gm"));

        let published = bot.publish(&"x".repeat(400)).await.unwrap();

        assert_eq!(published.text.chars().count(), 280);
        assert!(published.text.ends_with("..."));
    }

    struct SlowPosting {
        calls: StdMutex<u32>,
    }

    #[async_trait]
    impl PostingApi for SlowPosting {
        async fn post_tweet(&self, text: &str) -> BotResult<PublishedPost> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            Ok(PublishedPost {
                id: calls.to_string(),
                text: text.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn concurrent_publishes_never_exceed_cap() {
        let posting = Arc::new(SlowPosting {
            calls: StdMutex::new(0),
        });
        let bot = TrendsBot::new(
            test_config(),
            Arc::new(working_search()),
            posting.clone(),
            Arc::new(FakeGenerator::replying("gm")),
        );

        let (a, b, c) = tokio::join!(bot.publish("one"), bot.publish("two"), bot.publish("three"));

        let published = [&a, &b, &c].iter().filter(|r| r.is_ok()).count();
        assert_eq!(published, 2);
        assert!([a, b, c]
            .into_iter()
            .any(|r| matches!(r, Err(BotError::DailyCapReached { cap: 2 }))));
        assert_eq!(bot.post_count().await, 2);
        assert_eq!(*posting.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn failed_publish_releases_reserved_slot() {
        let posting = Arc::new(FakePosting::new(true));
        let bot = bot_with(working_search(), posting, FakeGenerator::replying("gm"));

        assert!(bot.publish("first").await.is_err());
        assert!(bot.publish("second").await.is_err());
        assert_eq!(bot.post_count().await, 0);
    }

    #[test]
    fn startup_summary_names_account_and_limits() {
        let bot = bot_with(
            working_search(),
            Arc::new(FakePosting::new(false)),
            FakeGenerator::replying("gm"),
        );

        assert_eq!(
            bot.startup_summary(),
            vec![
                "🤖 Bot username: @crypto_trends_bot",
                "📅 Posting schedule: 0 0 */6 * * *",
                "📊 Max posts per day: 2",
                "⏰ Analysis window: 24 hours",
            ]
        );
    }

    #[tokio::test]
    async fn status_reflects_state() {
        let posting = Arc::new(FakePosting::new(false));
        let bot = bot_with(working_search(), posting, FakeGenerator::failing());

        let status = bot.status().await;
        assert!(!status.is_running);
        assert_eq!(status.post_count, 0);
        assert_eq!(status.max_posts_per_day, 2);
        assert!(status.last_analysis.is_none());
        assert!(status.next_post_time.unwrap() > Utc::now());

        bot.start().await;
        let status = bot.status().await;
        assert!(status.is_running);
        assert_eq!(status.post_count, 1);
        assert!(status.last_analysis.is_some());
    }

    #[tokio::test]
    async fn analysis_only_run_does_not_publish() {
        let posting = Arc::new(FakePosting::new(false));
        let bot = bot_with(working_search(), posting.clone(), FakeGenerator::replying("gm"));

        let analysis = bot.run_analysis().await.unwrap().unwrap();

        assert_eq!(analysis.top_trends.len(), 2);
        assert!(posting.posted.lock().unwrap().is_empty());
        let report = bot.analysis_report().await.unwrap();
        assert_eq!(report.timestamp, analysis.timestamp);
    }
}
