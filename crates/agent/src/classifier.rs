use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use foodie_core::config::LlmConfig;
use serde::Serialize;
use thiserror::Error;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::intent::{parse_completion, ClassifiedIntent};
use crate::llm::{ChatCompletionRequest, LlmClient, LlmResponse, ResponseFormat};
use crate::prompt::{build_messages, PromptContext};

pub const NOT_CONFIGURED_REPLY: &str =
    "I'm sorry, my AI capabilities are not configured. Please contact support. 😔";
pub const HIGH_DEMAND_REPLY: &str =
    "I'm sorry, we're experiencing high demand. Please wait a moment and try again. 😔";
pub const GENERIC_FAILURE_REPLY: &str = "Something went wrong. Please try again. 😕";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("language model credential is not configured")]
    Configuration,
    #[error("language model throttled the request (retry after {retry_after:?})")]
    UpstreamThrottled { retry_after: Option<Duration> },
    #[error("language model still throttled after {attempts} attempts")]
    UpstreamUnavailable { attempts: u32 },
    #[error("language model returned HTTP {status}")]
    UpstreamStatus { status: u16 },
    #[error("language model transport failed: {0}")]
    Transport(String),
    #[error("language model response was malformed: {0}")]
    MalformedResponse(String),
}

impl ClassifierError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration => NOT_CONFIGURED_REPLY,
            Self::UpstreamThrottled { .. } | Self::UpstreamUnavailable { .. } => HIGH_DEMAND_REPLY,
            Self::UpstreamStatus { .. } | Self::Transport(_) | Self::MalformedResponse(_) => {
                GENERIC_FAILURE_REPLY
            }
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::UpstreamThrottled { .. } => "upstream_throttled",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::Transport(_) => "transport",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub min_request_interval: Duration,
    pub rate_limit_warning_threshold: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            min_request_interval: Duration::from_secs(2),
            rate_limit_warning_threshold: 10,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            min_request_interval: Duration::from_millis(config.min_request_interval_ms),
            rate_limit_warning_threshold: config.rate_limit_warning_threshold,
        }
    }

    /// Delay after the throttled attempt numbered `attempt` (zero based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Enforces the minimum spacing between requests from one session.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestPacer {
    last_request_at: Option<Instant>,
}

impl RequestPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_request_at(&self) -> Option<Instant> {
        self.last_request_at
    }

    /// Sleeps until `min_interval` has passed since the last recorded send.
    pub async fn wait(&self, min_interval: Duration) -> Duration {
        let Some(last) = self.last_request_at else {
            return Duration::ZERO;
        };
        let ready_at = last + min_interval;
        let now = Instant::now();
        if ready_at <= now {
            return Duration::ZERO;
        }
        sleep_until(ready_at).await;
        ready_at - now
    }

    pub fn mark_sent(&mut self) {
        self.last_request_at = Some(Instant::now());
    }
}

/// Raised when a successful response reports few remaining requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RateLimitAdvisory {
    pub remaining_requests: u32,
    pub remaining_tokens: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassificationOutcome {
    pub intent: ClassifiedIntent,
    pub attempts: u32,
    pub advisory: Option<RateLimitAdvisory>,
    pub failure: Option<ClassifierError>,
}

impl ClassificationOutcome {
    fn success(intent: ClassifiedIntent, attempts: u32, advisory: Option<RateLimitAdvisory>) -> Self {
        Self { intent, attempts, advisory, failure: None }
    }

    fn failure(error: ClassifierError, attempts: u32) -> Self {
        Self {
            intent: ClassifiedIntent::error(error.user_message()),
            attempts,
            advisory: None,
            failure: Some(error),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelSettings {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self { model: config.model.clone(), temperature: config.temperature, max_tokens: config.max_tokens }
    }
}

/// Turns one utterance into a structured intent. Every failure is folded into
/// an `error` intent carrying the reply to show the guest.
pub struct IntentClassifier<L> {
    client: L,
    settings: ModelSettings,
    policy: RetryPolicy,
    configuration_reported: AtomicBool,
}

impl<L> IntentClassifier<L>
where
    L: LlmClient,
{
    pub fn new(client: L, settings: ModelSettings, policy: RetryPolicy) -> Self {
        Self { client, settings, policy, configuration_reported: AtomicBool::new(false) }
    }

    pub fn from_config(client: L, config: &LlmConfig) -> Self {
        Self::new(client, ModelSettings::from_config(config), RetryPolicy::from_config(config))
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn classify(
        &self,
        context: &PromptContext<'_>,
        pacer: &mut RequestPacer,
    ) -> ClassificationOutcome {
        if !self.client.is_configured() {
            if !self.configuration_reported.swap(true, Ordering::Relaxed) {
                error!(
                    event_name = "agent.classifier.not_configured",
                    "language model credential missing; classification disabled"
                );
            }
            return ClassificationOutcome::failure(ClassifierError::Configuration, 0);
        }

        let request = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: build_messages(context),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: ResponseFormat::json_object(),
        };

        let waited = pacer.wait(self.policy.min_request_interval).await;
        if !waited.is_zero() {
            debug!(
                event_name = "agent.classifier.paced",
                waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                "delayed request to respect minimum spacing"
            );
        }

        let mut attempts = 0;
        while attempts < self.policy.max_attempts {
            let attempt = attempts;
            attempts += 1;

            let sent = self.client.send(&request).await;
            pacer.mark_sent();

            let response = match sent {
                Ok(response) => response,
                Err(transport) => {
                    warn!(
                        event_name = "agent.classifier.transport_error",
                        attempt = attempts,
                        error = %transport,
                        "language model request failed"
                    );
                    return ClassificationOutcome::failure(
                        ClassifierError::Transport(transport.to_string()),
                        attempts,
                    );
                }
            };

            if response.is_throttled() {
                let throttled = ClassifierError::UpstreamThrottled {
                    retry_after: response.rate_limit.retry_after,
                };
                if attempts >= self.policy.max_attempts {
                    warn!(
                        event_name = "agent.classifier.throttled",
                        attempt = attempts,
                        error = %throttled,
                        "language model throttled the final attempt"
                    );
                    break;
                }

                let delay = response.rate_limit.retry_after.unwrap_or_else(|| self.policy.backoff(attempt));
                warn!(
                    event_name = "agent.classifier.throttled",
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %throttled,
                    "language model throttled the request; backing off"
                );
                sleep(delay).await;
                continue;
            }

            if !response.is_success() {
                warn!(
                    event_name = "agent.classifier.upstream_status",
                    status = response.status,
                    "language model returned an error status"
                );
                return ClassificationOutcome::failure(
                    ClassifierError::UpstreamStatus { status: response.status },
                    attempts,
                );
            }

            let advisory = self.advisory_for(&response);
            return match parse_completion(&response.body) {
                Ok(intent) => {
                    info!(
                        event_name = "agent.classifier.classified",
                        intent = intent.kind.as_str(),
                        item_id = intent.item_id.as_deref().unwrap_or("none"),
                        quantity = intent.quantity,
                        attempts,
                        "utterance classified"
                    );
                    ClassificationOutcome::success(intent, attempts, advisory)
                }
                Err(parse_error) => {
                    warn!(
                        event_name = "agent.classifier.malformed_response",
                        error = %parse_error,
                        "language model response could not be parsed"
                    );
                    let mut outcome = ClassificationOutcome::failure(
                        ClassifierError::MalformedResponse(parse_error.to_string()),
                        attempts,
                    );
                    outcome.advisory = advisory;
                    outcome
                }
            };
        }

        let exhausted = ClassifierError::UpstreamUnavailable { attempts };
        error!(
            event_name = "agent.classifier.retries_exhausted",
            attempts,
            error = %exhausted,
            "giving up after repeated throttling"
        );
        ClassificationOutcome::failure(exhausted, attempts)
    }

    fn advisory_for(&self, response: &LlmResponse) -> Option<RateLimitAdvisory> {
        let remaining_tokens = response.rate_limit.remaining_tokens;
        if let Some(tokens) = remaining_tokens {
            debug!(event_name = "agent.classifier.remaining_tokens", remaining_tokens = tokens);
        }

        let remaining_requests = response.rate_limit.remaining_requests?;
        if remaining_requests >= self.policy.rate_limit_warning_threshold {
            return None;
        }

        warn!(
            event_name = "agent.classifier.rate_limit_low",
            remaining_requests,
            "language model request quota is running low"
        );
        Some(RateLimitAdvisory { remaining_requests, remaining_tokens })
    }
}
