use anyhow::{Context as _, Result};
use async_stream::try_stream;
use colored::Colorize;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

use crate::api::streaming::{ChunkAccumulator, SseFrameBuffer, StreamEvent};
use crate::config::{ClientConfig, API_KEY_ENV};
use crate::logging::{log_request, log_stream_chunk};
use crate::models::requests::{Content, GenerateContentRequest, Part, Tool};
use crate::models::responses::GenerateContentResponse;
use crate::models::{AttachedImage, ChatMessage, REWRITE_FAILURE_MESSAGE};

/// Fast model used for the one-shot rewrite call.
pub const REWRITE_MODEL: &str = "gemini-2.5-flash";

/// Shown by the rewrite helper when the client is degraded.
pub const CLIENT_UNAVAILABLE_MESSAGE: &str = "AI service is not available.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no API key configured; set {API_KEY_ENV}")]
    MissingKey,
    #[error("cannot send an empty message")]
    EmptyMessage,
}

/// Conversational context seeded with the prior turns of one session.
///
/// Contexts are opened statelessly from stored history; no provider-side
/// session is resumed. New turns are recorded locally so consecutive sends
/// within a session carry the full conversation.
pub struct ChatContext {
    contents: Vec<Content>,
    model: String,
    web_grounding: bool,
}

impl ChatContext {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn turn_count(&self) -> usize {
        self.contents.len()
    }

    /// Record the settled model reply so the next send includes it.
    pub fn record_reply(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.contents.push(Content::model(text));
    }
}

/// Client for the Generative Language API. Constructed without a credential
/// it degrades to a no-op: contexts cannot be opened and sending is disabled.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    verbose: bool,
}

impl GeminiClient {
    pub fn new(config: &ClientConfig) -> Self {
        if config.api_key.is_none() {
            eprintln!(
                "{} {} is not set; sending is disabled",
                "⚠️".yellow(),
                API_KEY_ENV
            );
        }
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            verbose: config.verbose,
        }
    }

    /// True when no credential is configured.
    pub fn is_degraded(&self) -> bool {
        self.api_key.is_none()
    }

    /// Open a context seeded with prior turns. Messages with neither text
    /// nor an image are skipped. Returns None on a degraded client.
    pub fn open_context(
        &self,
        history: &[ChatMessage],
        model: &str,
        web_grounding: bool,
    ) -> Option<ChatContext> {
        if self.is_degraded() {
            return None;
        }
        Some(ChatContext {
            contents: history.iter().filter_map(Content::from_message).collect(),
            model: model.to_string(),
            web_grounding,
        })
    }

    /// Stream one turn. The user content is recorded into the context up
    /// front; the caller records the settled reply via
    /// [`ChatContext::record_reply`]. The returned sequence is finite and
    /// single-pass; a mid-stream failure surfaces as an `Err` item.
    pub fn send(
        &self,
        ctx: &mut ChatContext,
        text: &str,
        image: Option<AttachedImage>,
    ) -> Result<impl Stream<Item = Result<StreamEvent>> + 'static, ApiError> {
        let api_key = self.api_key.clone().ok_or(ApiError::MissingKey)?;

        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(Part::text(text));
        }
        if let Some(image) = &image {
            parts.push(Part::inline_data(image));
        }
        if parts.is_empty() {
            return Err(ApiError::EmptyMessage);
        }

        ctx.contents.push(Content::user(parts));

        let request = GenerateContentRequest {
            contents: ctx.contents.clone(),
            tools: if ctx.web_grounding {
                vec![Tool::google_search()]
            } else {
                Vec::new()
            },
        };
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_url, ctx.model
        );
        log_request(&url, &request, self.verbose);

        let client = self.client.clone();
        let verbose = self.verbose;

        Ok(try_stream! {
            let response = client
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
                .context("Failed to reach the API")?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unable to read error body".to_string());
                Err(anyhow::anyhow!(
                    "API request failed with status {}: {}",
                    status,
                    body
                ))?;
            } else {
                let mut frames = SseFrameBuffer::new();
                let mut accumulator = ChunkAccumulator::new();
                let mut stream = response.bytes_stream();
                let mut chunk_counter = 0usize;

                while let Some(bytes) = stream.next().await {
                    let bytes = bytes.context("Error reading response stream")?;
                    for payload in frames.push(&bytes) {
                        chunk_counter += 1;
                        log_stream_chunk(chunk_counter, &payload, verbose);
                        for event in accumulator.apply(&payload) {
                            yield event;
                        }
                    }
                }

                yield StreamEvent::End;
            }
        })
    }

    /// One-shot, non-streaming text improvement with no session coupling.
    /// Any failure returns an explanatory placeholder instead of an error so
    /// the composer never loses the user's draft.
    pub async fn rewrite(&self, text: &str) -> String {
        let Some(api_key) = self.api_key.clone() else {
            return CLIENT_UNAVAILABLE_MESSAGE.to_string();
        };

        let prompt = format!(
            "Please enhance and rephrase the following text to be more detailed, clear, \
             and professional. Return only the enhanced text, without any introductory \
             phrases like \"Here is the enhanced text:\":\n\n\"{}\"",
            text
        );
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(&prompt)])],
            tools: Vec::new(),
        };
        let url = format!("{}/models/{}:generateContent", self.api_url, REWRITE_MODEL);
        log_request(&url, &request, self.verbose);

        match self.try_rewrite(&url, &api_key, &request).await {
            Ok(improved) => improved,
            Err(e) => {
                eprintln!("{} Rewrite failed: {:#}", "⚠️".yellow(), e);
                REWRITE_FAILURE_MESSAGE.to_string()
            }
        }
    }

    async fn try_rewrite(
        &self,
        url: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .context("Failed to reach the API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            anyhow::bail!("API request failed with status {}: {}", status, body);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse rewrite response")?;
        Ok(body.text().trim().to_string())
    }
}
