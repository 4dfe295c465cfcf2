//! LLM API interaction for dramatizing the selected article.
//!
//! This module talks to an OpenAI-compatible `/chat/completions` endpoint.
//! The prompt asks for a longer, sensationalist retelling of a headline and
//! teaser, in Spanish, with invented detail when the source is thin.
//!
//! # Architecture
//!
//! - [`Enricher`]: trait the pipeline depends on
//! - [`OpenAiClient`]: the production implementation
//!
//! There is no retry here. A failed or empty completion is returned as an
//! [`EnrichError`] and the pipeline gives up on the run.

use crate::error::EnrichError;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// Trait for producing the long-form description of an article.
pub trait Enricher {
    /// Expand `title` and `summary` into a complete sensationalist passage.
    ///
    /// # Errors
    ///
    /// Transport failures, error statuses and empty completions are all errors.
    async fn enrich(&self, title: &str, summary: &str) -> Result<String, EnrichError>;
}

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 300;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Build the user prompt for a news item.
pub fn build_prompt(title: &str, summary: &str) -> String {
    format!(
        "Considera la siguiente noticia: \"{title} - {summary}\". \
         Proporciona una descripción más detallada de la noticia. \
         Escribe de manera sensacionalista y llamativa, como un redactor de noticias. \
         Si no hay suficiente información en el título, inventa detalles para que el artículo sea más atractivo. \
         Asegúrate de que la descripción esté completa y no se corte a la mitad."
    )
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Trimmed text of the first choice, or [`EnrichError::EmptyContent`].
fn completion_text(response: ChatCompletionResponse) -> Result<String, EnrichError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(EnrichError::EmptyContent)
}

/// Settings for [`OpenAiClient`].
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Generation budget per completion.
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// [`Enricher`] backed by an OpenAI-compatible chat completions API.
#[derive(Debug)]
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, title: &str, summary: &str) -> ChatCompletionRequest<'_> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(title, summary),
                },
            ],
            max_tokens: self.config.max_tokens,
        }
    }
}

impl Enricher for OpenAiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.config.model))]
    async fn enrich(&self, title: &str, summary: &str) -> Result<String, EnrichError> {
        let t0 = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(title, summary))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            error!(
                %status,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body = %truncate_for_log(&body, 300),
                "Completion request failed"
            );
            return Err(EnrichError::Status { status, body });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let text = completion_text(parsed)?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            preview = %truncate_for_log(&text, 120),
            "Generated description"
        );
        Ok(text)
    }
}
