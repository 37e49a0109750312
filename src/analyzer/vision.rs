//! Vision API client.
//!
//! Speaks the OpenAI-compatible `/chat/completions` wire format directly
//! over reqwest, so any compatible gateway works by pointing
//! `OPENAI_BASE_URL` at it. Every call is attempted exactly once: no
//! retries, no backoff, no client-side timeout. The analyzer degrades on
//! failure instead of retrying, and a stuck call is surfaced by the
//! caller's own patience rather than a tuned timeout constant.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::analyzer::encode::ImagePayload;
use crate::analyzer::prompts;
use crate::config::VisionApiConfig;

/// Sampling temperature for both calls. Near-zero keeps transcription
/// faithful and classification stable across identical inputs.
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum VisionError {
    /// HTTP 429 from the provider.
    #[error("vision API rate limit exceeded")]
    RateLimited,

    /// HTTP 401 or 403 from the provider.
    #[error("vision API rejected the credentials: {0}")]
    Unauthorized(String),

    /// Any other non-success status.
    #[error("vision API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Connection-level failure before a status was received.
    #[error("vision API transport error: {0}")]
    Transport(String),

    /// A 2xx reply without usable message content.
    #[error("vision API returned an empty reply")]
    EmptyReply,
}

/// The remote analysis capability: one OCR call, two classification shapes.
///
/// Kept narrow so tests can drive the analyzer with canned or failing
/// implementations.
#[async_trait]
pub trait VisionOcr: Send + Sync {
    /// Verbatim transcription of a document image.
    async fn transcribe(&self, image: &ImagePayload) -> Result<String, VisionError>;

    /// Classification reply (JSON text) for transcribed document text.
    async fn classify_text(&self, extracted: &str) -> Result<String, VisionError>;

    /// Filename-only classification reply, for PDFs that would not render.
    async fn classify_filename(&self, file_name: &str) -> Result<String, VisionError>;
}

/// Production client for an OpenAI-compatible endpoint.
pub struct OpenAiVision {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiVision {
    pub fn new(cfg: &VisionApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        }
    }

    async fn chat(&self, messages: Value) -> Result<String, VisionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": messages,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VisionError::Transport(e.to_string()))?;

        match status.as_u16() {
            429 => return Err(VisionError::RateLimited),
            401 | 403 => return Err(VisionError::Unauthorized(error_message(&text))),
            s if !status.is_success() => {
                return Err(VisionError::Api {
                    status: s,
                    message: error_message(&text),
                })
            }
            _ => {}
        }

        let value: Value = serde_json::from_str(&text).map_err(|_| VisionError::EmptyReply)?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(VisionError::EmptyReply);
        }
        debug!(model = %self.model, reply_chars = content.len(), "chat completion finished");
        Ok(content.to_string())
    }
}

#[async_trait]
impl VisionOcr for OpenAiVision {
    async fn transcribe(&self, image: &ImagePayload) -> Result<String, VisionError> {
        self.chat(json!([
            { "role": "system", "content": prompts::TRANSCRIBE_PROMPT },
            { "role": "user", "content": [
                { "type": "image_url",
                  "image_url": { "url": image.data_url(), "detail": "high" } }
            ]}
        ]))
        .await
    }

    async fn classify_text(&self, extracted: &str) -> Result<String, VisionError> {
        self.chat(json!([
            { "role": "system", "content": prompts::CLASSIFY_PROMPT },
            { "role": "user",
              "content": format!("Transcribed document text:\n\n{extracted}") }
        ]))
        .await
    }

    async fn classify_filename(&self, file_name: &str) -> Result<String, VisionError> {
        self.chat(json!([
            { "role": "system", "content": prompts::CLASSIFY_FILENAME_PROMPT },
            { "role": "user", "content": format!("File name: {file_name}") }
        ]))
        .await
    }
}

/// Best-effort extraction of the provider's error message; falls back to a
/// truncated raw body so logs stay readable on HTML error pages.
fn error_message(body: &str) -> String {
    if let Some(msg) = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
    {
        return msg;
    }
    let trimmed = body.trim();
    if trimmed.len() > 200 {
        let mut end = 200;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &trimmed[..end])
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_provider_shape() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
    }

    #[test]
    fn error_message_truncates_raw_bodies() {
        let body = "x".repeat(500);
        let msg = error_message(&body);
        assert!(msg.len() <= 204);
        assert!(msg.ends_with('…'));
    }

    #[test]
    fn variants_render_distinct_messages() {
        assert!(VisionError::RateLimited.to_string().contains("rate limit"));
        let api = VisionError::Api { status: 503, message: "overloaded".into() };
        assert!(api.to_string().contains("503"));
        assert!(api.to_string().contains("overloaded"));
    }
}
