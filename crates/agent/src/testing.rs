use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::llm::{ChatCompletionRequest, LlmClient, LlmResponse, LlmTransportError, RateLimitHeaders};

pub fn completion_body(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
}

#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Response(LlmResponse),
    Transport(LlmTransportError),
}

impl ScriptedReply {
    pub fn ok(body: String) -> Self {
        Self::Response(LlmResponse { status: 200, rate_limit: RateLimitHeaders::default(), body })
    }

    pub fn throttled(retry_after: Option<Duration>) -> Self {
        Self::Response(LlmResponse {
            status: 429,
            rate_limit: RateLimitHeaders { retry_after, ..RateLimitHeaders::default() },
            body: r#"{"error":{"message":"rate limited"}}"#.to_string(),
        })
    }

    pub fn status(status: u16) -> Self {
        Self::Response(LlmResponse {
            status,
            rate_limit: RateLimitHeaders::default(),
            body: r#"{"error":{"message":"upstream failure"}}"#.to_string(),
        })
    }

    pub fn with_remaining(self, requests: u32, tokens: Option<u32>) -> Self {
        match self {
            Self::Response(mut response) => {
                response.rate_limit.remaining_requests = Some(requests);
                response.rate_limit.remaining_tokens = tokens;
                Self::Response(response)
            }
            other => other,
        }
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<ChatCompletionRequest>,
}

/// Replays queued replies in order and records every request it receives.
#[derive(Clone)]
pub struct ScriptedLlm {
    configured: bool,
    script: Arc<Mutex<Script>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            configured: true,
            script: Arc::new(Mutex::new(Script { replies: replies.into(), requests: Vec::new() })),
        }
    }

    pub fn unconfigured() -> Self {
        Self { configured: false, ..Self::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.script.lock().expect("script lock").requests.len()
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.script.lock().expect("script lock").requests.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<LlmResponse, LlmTransportError> {
        let mut script = self.script.lock().expect("script lock");
        script.requests.push(request.clone());
        match script.replies.pop_front() {
            Some(ScriptedReply::Response(response)) => Ok(response),
            Some(ScriptedReply::Transport(error)) => Err(error),
            None => Err(LlmTransportError::Request("script exhausted".to_string())),
        }
    }
}
