/// Scheduler Module
///
/// Registers the cron jobs that drive the bot: scheduled posting and the
/// midnight (UTC) reset of the daily post counter.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::bot::TrendsBot;
use crate::config::normalize_cron;

/// Seconds-first cron expression for the daily counter reset
pub const DAILY_RESET_SCHEDULE: &str = "0 0 0 * * *";

/// Build the posting job. Each tick runs one cycle through the bot, which
/// itself skips the cycle when stopped or over the daily cap.
pub fn posting_job(bot: Arc<TrendsBot>, schedule: &str) -> Result<Job> {
    let expression = normalize_cron(schedule);

    Job::new_async(expression.as_str(), move |_uuid, _lock| {
        let bot = Arc::clone(&bot);
        Box::pin(async move {
            bot.scheduled_tick().await;
        })
    })
    .with_context(|| format!("Failed to create posting job for '{}'", expression))
}

pub fn daily_reset_job(bot: Arc<TrendsBot>) -> Result<Job> {
    Job::new_async(DAILY_RESET_SCHEDULE, move |_uuid, _lock| {
        let bot = Arc::clone(&bot);
        Box::pin(async move {
            bot.reset_daily_counter().await;
        })
    })
    .context("Failed to create daily reset job")
}

/// Start the cron scheduler with the posting and daily reset jobs
pub async fn start_scheduler(bot: Arc<TrendsBot>) -> Result<JobScheduler> {
    let schedule = bot.config().posting_schedule.clone();

    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create job scheduler")?;

    scheduler
        .add(posting_job(bot.clone(), &schedule)?)
        .await
        .context("Failed to register posting job")?;
    log::info!("📅 Posts scheduled with cron: {}", normalize_cron(&schedule));

    scheduler
        .add(daily_reset_job(bot.clone())?)
        .await
        .context("Failed to register daily reset job")?;
    log::info!("📅 Daily counter reset scheduled for midnight UTC");

    scheduler
        .start()
        .await
        .context("Failed to start job scheduler")?;

    if let Some(next) = bot.status().await.next_post_time {
        log::info!(
            "📅 Next scheduled post: {}",
            next.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(scheduler)
}

/// Stop the bot and tear down its jobs. A cycle already in flight runs to
/// completion.
pub async fn shutdown(bot: &TrendsBot, mut scheduler: JobScheduler) {
    bot.stop().await;

    if let Err(e) = scheduler.shutdown().await {
        log::warn!("Scheduler shutdown error: {:?}", e);
    }
    log::info!("Scheduler stopped");
}
