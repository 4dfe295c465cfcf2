//! Delivery of selected articles to the Telegram channel.
//!
//! The caption format and the photo-versus-text decision are pure
//! ([`compose_caption`], [`plan_delivery`]) so they can be checked without a
//! network. [`TelegramClient`] is a thin wrapper over the Bot API methods the
//! bot needs: `sendMessage`, `sendPhoto` and `getUpdates`.
//!
//! # Delivery rule
//!
//! | Caption length (UTF-16 units) | Image | Method |
//! |-------------------------------|-------|--------|
//! | > 1024 | any | `sendMessage` |
//! | ≤ 1024 | yes | `sendPhoto` with caption |
//! | ≤ 1024 | no | `sendMessage` |

use crate::error::PublishError;
use crate::models::EnrichedArticle;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

/// Telegram's maximum photo caption length.
pub const CAPTION_LIMIT: usize = 1024;

pub const NOTHING_NEW_NOTICE: &str = "No se encontraron noticias relevantes en este momento.";
pub const COMMAND_ERROR_NOTICE: &str = "Hubo un error al obtener las noticias.";
pub const SCHEDULED_ERROR_NOTICE: &str = "Hubo un error al obtener las noticias programadas.";

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const PARSE_MODE: &str = "Markdown";

/// Markdown body for an article: bold title, description, "read more" link.
pub fn compose_caption(article: &EnrichedArticle) -> String {
    format!(
        "*{}*\n\n{}\n\n[Leer más]({})",
        article.title, article.detailed_description, article.url
    )
}

/// Length as Telegram counts it.
pub fn caption_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// How an article will be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Photo { photo: String, caption: String },
    Text { text: String },
}

/// Decide between a captioned photo and a plain message.
pub fn plan_delivery(article: &EnrichedArticle) -> Delivery {
    let caption = compose_caption(article);
    match &article.image_url {
        Some(photo) if caption_len(&caption) <= CAPTION_LIMIT => Delivery::Photo {
            photo: photo.clone(),
            caption,
        },
        _ => Delivery::Text { text: caption },
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendPhoto<'a> {
    chat_id: &'a str,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

/// An incoming Bot API update. Only text messages are of interest.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub channel_post: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub text: Option<String>,
}

impl Update {
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .or(self.channel_post.as_ref())
            .and_then(|m| m.text.as_deref())
    }
}

/// Minimal Telegram Bot API client.
pub struct TelegramClient {
    client: Client,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TelegramClient {
    pub fn new(token: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Per-request timeouts; long polling needs a longer one than sends.
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            token,
            timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", TELEGRAM_API_BASE, self.token, method)
    }

    async fn call<B, T>(
        &self,
        method: &'static str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, PublishError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            // reqwest errors carry the URL, which contains the token.
            .map_err(|e| e.without_url())?
            .json()
            .await
            .map_err(|e| e.without_url())?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(PublishError::Rejected {
                method,
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    #[instrument(level = "info", skip_all, fields(%chat_id, chars = text.chars().count()))]
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markdown: bool,
    ) -> Result<(), PublishError> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: markdown.then_some(PARSE_MODE),
        };
        let _: serde_json::Value = self.call("sendMessage", &body, self.timeout).await?;
        Ok(())
    }

    #[instrument(level = "info", skip_all, fields(%chat_id, %photo))]
    pub async fn send_photo(
        &self,
        chat_id: &str,
        photo: &str,
        caption: &str,
    ) -> Result<(), PublishError> {
        let body = SendPhoto {
            chat_id,
            photo,
            caption,
            parse_mode: PARSE_MODE,
        };
        let _: serde_json::Value = self.call("sendPhoto", &body, self.timeout).await?;
        Ok(())
    }

    /// Long-poll for updates after `offset`, waiting up to `poll` on the server side.
    pub async fn get_updates(&self, offset: i64, poll: Duration) -> Result<Vec<Update>, PublishError> {
        let body = GetUpdates {
            offset,
            timeout: poll.as_secs(),
            allowed_updates: ["message", "channel_post"],
        };
        self.call("getUpdates", &body, poll + self.timeout).await
    }
}

/// Sends articles and notices to the single configured channel.
#[derive(Debug)]
pub struct Publisher {
    telegram: TelegramClient,
    channel_id: String,
}

impl Publisher {
    pub fn new(telegram: TelegramClient, channel_id: String) -> Self {
        Self {
            telegram,
            channel_id,
        }
    }

    pub fn telegram(&self) -> &TelegramClient {
        &self.telegram
    }
}

/// Where the bot posts its results.
pub trait Channel {
    /// Post an enriched article.
    async fn publish_article(&self, article: &EnrichedArticle) -> Result<(), PublishError>;

    /// Plain-text notice such as [`NOTHING_NEW_NOTICE`].
    async fn notify(&self, notice: &str) -> Result<(), PublishError>;
}

impl Channel for Publisher {
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    async fn publish_article(&self, article: &EnrichedArticle) -> Result<(), PublishError> {
        match plan_delivery(article) {
            Delivery::Photo { photo, caption } => {
                self.telegram
                    .send_photo(&self.channel_id, &photo, &caption)
                    .await?
            }
            Delivery::Text { text } => {
                self.telegram
                    .send_message(&self.channel_id, &text, true)
                    .await?
            }
        }
        info!("News sent to channel");
        Ok(())
    }

    async fn notify(&self, notice: &str) -> Result<(), PublishError> {
        self.telegram
            .send_message(&self.channel_id, notice, false)
            .await
    }
}
