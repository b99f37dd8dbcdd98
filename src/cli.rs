//! CLI argument parsing for the drawcast bot.
//!
//! Uses clap for argument parsing with environment variable fallbacks, so the
//! bot can be driven entirely from a `.env` file.

use clap::Parser;

pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_FEED_URL: &str =
    "https://draw.ar-lottery01.com/WinGo/WinGo_1M/GetHistoryIssuePage.json";
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Drawcast - watches a draw-history feed and pushes AI predictions to
/// Telegram subscribers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct BotArgs {
    /// Telegram bot token
    #[arg(long = "telegram-token", env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: String,

    /// API key for the inference endpoint
    #[arg(long = "groq-api-key", env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: String,

    /// Access key subscribers must supply with /start
    #[arg(long = "access-key", env = "ACCESS_KEY", hide_env_values = true)]
    pub access_key: String,

    /// Model to request predictions from
    #[arg(long = "model", env = "MODEL_ID", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Seconds between poll ticks
    #[arg(
        short = 'i',
        long = "poll-interval",
        env = "POLL_INTERVAL",
        default_value = "5"
    )]
    pub poll_interval: u64,

    /// Draw-history endpoint (paged)
    #[arg(long = "feed-url", env = "FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// Chat-completions endpoint of the inference service
    #[arg(long = "api-url", env = "MODEL_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}
