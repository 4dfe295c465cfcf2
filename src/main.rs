//! # Sensational News
//!
//! A Telegram bot that scrapes the front pages of Spanish-language news
//! portals, picks a story it has not posted yet, has an LLM retell it in a
//! sensationalist tone and posts it to a channel.
//!
//! ## Usage
//!
//! ```sh
//! sensational_news            # run the bot: every 3 hours and on /news
//! sensational_news --once     # post one article and exit
//! ```
//!
//! ## Architecture
//!
//! One pipeline run is:
//! 1. **Gathering**: fetch each portal front page and extract `<article>` blocks
//! 2. **Filtering**: drop URLs already listed in the history file
//! 3. **Selection**: pick one of the rest at random
//! 4. **Enrichment**: find an image if needed and generate the description
//! 5. **Recording**: append the URL to the history file
//!
//! The bot layer then posts the result, or a notice when there was nothing
//! new or the run failed.

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod bot;
mod cli;
mod error;
mod history;
mod images;
mod models;
mod pipeline;
mod publish;
mod scrapers;
mod sources;
#[cfg(test)]
mod test_utils;
mod utils;

use api::{OpenAiClient, OpenAiConfig};
use cli::Cli;
use history::FileHistory;
use images::UnsplashClient;
use pipeline::Pipeline;
use publish::{Publisher, TelegramClient};
use scrapers::HttpFetcher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(
        history_file = %args.history_file.display(),
        sources = ?args.sources,
        model = %args.openai_model,
        once = args.once,
        "Parsed CLI arguments"
    );

    let timeout = Duration::from_secs(args.http_timeout_secs);
    let sources = sources::load_sources(args.sources.as_deref()).await?;

    let enricher = OpenAiClient::new(OpenAiConfig {
        api_key: args.openai_api_key,
        model: args.openai_model,
        base_url: args.openai_base_url,
        max_tokens: args.max_tokens,
        timeout,
    })?;

    let pipeline = Pipeline::new(
        sources,
        HttpFetcher::new(timeout)?,
        UnsplashClient::new(args.unsplash_access_key, timeout)?,
        enricher,
        FileHistory::new(&args.history_file),
        StdRng::from_os_rng(),
    );

    let publisher = Publisher::new(
        TelegramClient::new(args.telegram_bot_token, timeout)?,
        args.channel_id,
    );

    if args.once {
        info!("Running a single pipeline pass");
        bot::run_once(pipeline, publisher).await;
    } else {
        bot::run(pipeline, publisher).await;
    }

    Ok(())
}
