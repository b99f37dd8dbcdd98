use anyhow::{Context, Result};
use clap::Parser;
use drawcast::cli::BotArgs;
use drawcast::feed::{FeedClient, FeedSource};
use drawcast::poll::DeliverySink;
use drawcast::predictor::{GroqPredictor, Predictor};
use drawcast::registry::SubscriptionRegistry;
use drawcast::telegram::commands::Bot;
use drawcast::telegram::TelegramClient;
use drawcast::utils::logging::init_logging;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let args = BotArgs::parse();
    run(args).await
}

async fn run(args: BotArgs) -> Result<()> {
    let feed_url = Url::parse(&args.feed_url).context("Invalid feed URL")?;
    let api_url = Url::parse(&args.api_url).context("Invalid inference API URL")?;

    let telegram = Arc::new(TelegramClient::new(&args.telegram_token)?);
    let feed: Arc<dyn FeedSource> = Arc::new(FeedClient::new(feed_url)?);
    let predictor: Arc<dyn Predictor> =
        Arc::new(GroqPredictor::new(api_url, args.groq_api_key, args.model)?);
    let sink: Arc<dyn DeliverySink> = telegram.clone();

    let bot = Bot::new(
        Arc::new(SubscriptionRegistry::new()),
        feed,
        predictor,
        sink,
        args.access_key,
        Duration::from_secs(args.poll_interval),
    );

    if let Err(e) = telegram.set_my_commands().await {
        warn!("Could not register bot commands: {e:#}");
    }

    info!("Bot is running...");
    let mut offset = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
            updates = telegram.get_updates(offset) => {
                let updates = match updates {
                    Ok(updates) => updates,
                    Err(e) => {
                        warn!("getUpdates failed: {e:#}");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        continue;
                    }
                };
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let Some((chat_id, reply)) = bot.handle_update(&update) else {
                        continue;
                    };
                    if let Err(e) = telegram.send_message(chat_id, &reply, false).await {
                        warn!("Reply to chat {chat_id} failed: {e:#}");
                    }
                }
            }
        }
    }
}
