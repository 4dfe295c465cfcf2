//! Command-line interface definitions.
//!
//! Every option can also be supplied through the environment variable named
//! next to it, which is how the bot is normally deployed. The four service
//! credentials are required, so a misconfigured process exits at startup
//! instead of failing halfway through a run.

use crate::api::{DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Credentials from the environment, run as a bot
/// OPENAI_API_KEY=... UNSPLASH_ACCESS_KEY=... TELEGRAM_BOT_TOKEN=... CHANNEL_ID=@canal sensational_news
///
/// # Post a single article and exit
/// sensational_news --once --history-file /var/lib/news/sent_news.txt
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// API key for the chat completions service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    pub openai_api_key: String,

    /// Unsplash access key used for image search
    #[arg(long, env = "UNSPLASH_ACCESS_KEY", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    pub unsplash_access_key: String,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    pub telegram_bot_token: String,

    /// Target channel id (numeric id or @username)
    #[arg(long, env = "CHANNEL_ID", value_parser = NonEmptyStringValueParser::new())]
    pub channel_id: String,

    /// File recording the URLs already sent
    #[arg(long, env = "SENT_NEWS_FILE", default_value = "sent_news.txt")]
    pub history_file: PathBuf,

    /// YAML list of portal URLs replacing the built-in list
    #[arg(long, env = "NEWS_SOURCES_FILE")]
    pub sources: Option<PathBuf>,

    /// Chat model name
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Token budget for each generated description
    #[arg(long, env = "OPENAI_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Timeout in seconds for every outbound HTTP request
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 20)]
    pub http_timeout_secs: u64,

    /// Publish a single article and exit instead of running the bot
    #[arg(long)]
    pub once: bool,
}
