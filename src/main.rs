/// Crypto Trends Bot
///
/// An X (Twitter) bot that watches crypto hashtags, scores what is trending
/// and posts a short market summary on a cron schedule.
///
/// The bot:
/// - Searches recent posts for each configured keyword
/// - Ranks topics by mentions, engagement and sentiment
/// - Summarizes the market with GPT, falling back to a template
/// - Posts at most `TWEET_RATE_LIMIT` times per day

use anyhow::Result;
use clap::Parser;
use crypto_trends_bot::{bot, config, http_server, scheduler};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "crypto-trends-bot", version, about = "Crypto trends bot for X")]
struct Cli {
    /// Print the bot status as JSON and exit
    #[arg(long)]
    status: bool,

    /// Run one cycle immediately and exit
    #[arg(long)]
    force_post: bool,

    /// Run an analysis without posting and print the report
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    pretty_env_logger::init();

    // Load configuration from environment
    let cfg = config::Config::from_env()?;
    cfg.validate()?;

    let http_port = cfg.http_port;
    let admin_secret = cfg.admin_api_secret.clone();
    let bot = Arc::new(bot::TrendsBot::from_config(cfg)?);

    if cli.status {
        println!("{}", serde_json::to_string_pretty(&bot.status().await)?);
        return Ok(());
    }

    if cli.force_post {
        let outcome = bot.force_post().await?;
        println!("{:?}", outcome);
        return Ok(());
    }

    if cli.report {
        bot.run_analysis().await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&bot.analysis_report().await)?
        );
        return Ok(());
    }

    log::info!("Starting Crypto Trends Bot...");

    bot.start().await;
    let job_scheduler = scheduler::start_scheduler(bot.clone()).await?;

    if let Some(port) = http_port {
        let state = http_server::AppState {
            bot: bot.clone(),
            admin_secret,
        };
        tokio::spawn(async move {
            if let Err(e) = http_server::start_server(state, port).await {
                log::error!("HTTP server stopped: {}", e);
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    log::info!("Received shutdown signal");

    scheduler::shutdown(&bot, job_scheduler).await;

    log::info!("Bot stopped");
    Ok(())
}
