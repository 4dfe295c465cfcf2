//! Triggers that run the pipeline and post its outcome.
//!
//! Two triggers share one pipeline behind an async mutex:
//!
//! - a timer firing at every local hour divisible by three (cron `0 */3 * * *`)
//! - a `/news` command, read by long-polling the Bot API
//!
//! Holding the mutex for the whole run-and-publish means overlapping triggers
//! queue up instead of reading the same history twice.

use crate::api::{Enricher, OpenAiClient};
use crate::history::{FileHistory, HistoryStore};
use crate::images::{ImageSearch, UnsplashClient};
use crate::models::Selection;
use crate::pipeline::Pipeline;
use crate::publish::{
    COMMAND_ERROR_NOTICE, Channel, NOTHING_NEW_NOTICE, Publisher, SCHEDULED_ERROR_NOTICE,
};
use crate::scrapers::{HttpFetcher, PageFetcher};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Timelike};
use once_cell::sync::Lazy;
use rand::Rng;
use rand::rngs::StdRng;
use regex::Regex;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

pub type NewsPipeline = Pipeline<HttpFetcher, UnsplashClient, OpenAiClient, FileHistory, StdRng>;

/// Hours between scheduled posts.
const SCHEDULE_EVERY_HOURS: u32 = 3;
/// Server-side wait for `getUpdates`.
const POLL_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

static NEWS_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/news(@\w+)?(\s|$)").unwrap());

/// What caused a pipeline run. Only changes which error notice is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Command,
    Scheduled,
}

impl Trigger {
    pub fn error_notice(self) -> &'static str {
        match self {
            Trigger::Command => COMMAND_ERROR_NOTICE,
            Trigger::Scheduled => SCHEDULED_ERROR_NOTICE,
        }
    }
}

/// `true` for `/news`, `/news@SomeBot` and either followed by arguments.
pub fn is_news_command(text: &str) -> bool {
    NEWS_COMMAND.is_match(text.trim_start())
}

/// The first instant strictly after `now` at minute zero of an hour divisible by three.
pub fn next_fire_after<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let local = now.naive_local();
    let mut candidate = local
        - TimeDelta::minutes(local.minute() as i64)
        - TimeDelta::seconds(local.second() as i64)
        - TimeDelta::nanoseconds(local.nanosecond() as i64);

    loop {
        candidate += TimeDelta::hours(1);
        if candidate.hour() % SCHEDULE_EVERY_HOURS != 0 {
            continue;
        }
        // Skipped local times (DST gaps) have no mapping; try the next slot.
        if let Some(at) = tz.from_local_datetime(&candidate).earliest() {
            if at > *now {
                return at;
            }
        }
    }
}

/// Run the pipeline once and post whatever came out of it.
#[instrument(level = "info", skip(pipeline, channel))]
pub async fn handle_trigger<F, S, E, H, R, C>(
    pipeline: &Mutex<Pipeline<F, S, E, H, R>>,
    channel: &C,
    trigger: Trigger,
) where
    F: PageFetcher,
    S: ImageSearch,
    E: Enricher,
    H: HistoryStore,
    R: Rng,
    C: Channel,
{
    let mut pipeline = pipeline.lock().await;

    let notice = match pipeline.run().await {
        Ok(Selection::Published(article)) => match channel.publish_article(&article).await {
            Ok(()) => return,
            Err(e) => {
                error!(error = %e, url = %article.url, "Error sending news");
                trigger.error_notice()
            }
        },
        Ok(Selection::NothingNew) => {
            info!("No new articles found");
            NOTHING_NEW_NOTICE
        }
        Err(e) => {
            error!(error = %e, "Error fetching news");
            trigger.error_notice()
        }
    };

    if let Err(e) = channel.notify(notice).await {
        error!(error = %e, "Failed to send notice");
    }
}

async fn run_schedule(pipeline: &Mutex<NewsPipeline>, publisher: &Publisher) {
    loop {
        let now = Local::now();
        let next = next_fire_after(&now);
        info!(next = %next.to_rfc3339(), "Next scheduled post");
        tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

        info!("Scheduled task triggered");
        handle_trigger(pipeline, publisher, Trigger::Scheduled).await;
    }
}

async fn run_commands(pipeline: &Mutex<NewsPipeline>, publisher: &Publisher) {
    let mut offset = 0i64;
    loop {
        let updates = match publisher.telegram().get_updates(offset, POLL_TIMEOUT).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Polling for commands failed");
                tokio::time::sleep(POLL_ERROR_PAUSE).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            if update.text().is_some_and(is_news_command) {
                info!(update_id = update.update_id, "Received /news command");
                handle_trigger(pipeline, publisher, Trigger::Command).await;
            }
        }
    }
}

/// Serve both triggers until Ctrl-C.
pub async fn run(pipeline: NewsPipeline, publisher: Publisher) {
    let pipeline = Mutex::new(pipeline);
    info!("Bot started");

    tokio::select! {
        _ = run_schedule(&pipeline, &publisher) => {}
        _ = run_commands(&pipeline, &publisher) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
        }
    }
}

/// Run a single scheduled-style trigger and return.
pub async fn run_once(pipeline: NewsPipeline, publisher: Publisher) {
    let pipeline = Mutex::new(pipeline);
    handle_trigger(&pipeline, &publisher, Trigger::Scheduled).await;
}
