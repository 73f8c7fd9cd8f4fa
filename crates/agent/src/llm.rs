use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Serialize;
use thiserror::Error;

pub const HTTP_TOO_MANY_REQUESTS: u16 = 429;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self { kind: "json_object".to_string() }
    }
}

/// OpenAI-compatible chat completion body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

/// Rate-limit hints read from upstream response headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub retry_after: Option<Duration>,
    pub remaining_requests: Option<u32>,
    pub remaining_tokens: Option<u32>,
}

impl RateLimitHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

        Self {
            retry_after: header("retry-after").and_then(parse_retry_after),
            remaining_requests: header("x-ratelimit-remaining-requests")
                .and_then(|value| value.trim().parse().ok()),
            remaining_tokens: header("x-ratelimit-remaining-tokens")
                .and_then(|value| value.trim().parse().ok()),
        }
    }
}

/// Seconds, fractional values allowed. HTTP-date values are not understood and
/// fall back to the caller's own backoff.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds = value.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlmResponse {
    pub status: u16,
    pub rate_limit: RateLimitHeaders,
    pub body: String,
}

impl LlmResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_throttled(&self) -> bool {
        self.status == HTTP_TOO_MANY_REQUESTS
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmTransportError {
    #[error("language model request timed out: {0}")]
    Timeout(String),
    #[error("language model request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// False when no credential was supplied; the classifier will not send.
    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<LlmResponse, LlmTransportError>;
}
