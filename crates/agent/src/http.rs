use std::time::Duration;

use async_trait::async_trait;
use foodie_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::llm::{ChatCompletionRequest, LlmClient, LlmResponse, LlmTransportError, RateLimitHeaders};

/// `LlmClient` backed by an OpenAI-compatible chat completions endpoint.
pub struct HttpLlmClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpLlmClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, LlmTransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LlmTransportError::Request(format!("http client build failed: {error}")))?;

        Ok(Self { client, endpoint: endpoint.into(), api_key })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmTransportError> {
        let api_key = config.has_api_key().then(|| config.api_key.clone()).flatten();
        Self::new(config.base_url.clone(), api_key, Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<LlmResponse, LlmTransportError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let rate_limit = RateLimitHeaders::from_headers(response.headers());
        let body = response.text().await.map_err(map_transport_error)?;

        Ok(LlmResponse { status, rate_limit, body })
    }
}

fn map_transport_error(error: reqwest::Error) -> LlmTransportError {
    if error.is_timeout() {
        LlmTransportError::Timeout(error.to_string())
    } else {
        LlmTransportError::Request(error.to_string())
    }
}
