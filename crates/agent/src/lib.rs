//! Agent Runtime - LLM-powered intent classification and order orchestration
//!
//! This crate is the conversational side of the Foodie assistant:
//! - Classifies a guest utterance into a structured intent via a chat model
//! - Paces and retries model calls under upstream rate limits
//! - Applies order intents to the cart through the deterministic core
//! - Decides the final reply text shown to the guest
//!
//! # Architecture
//!
//! Each utterance follows a constrained loop:
//! 1. **Prompting** (`prompt`) - Menu, promotions, cart and history → chat messages
//! 2. **Classification** (`classifier`) - Pacing, 429 backoff, `intent` parsing
//! 3. **Cart Update** (`runtime`) - Catalog lookup, stock check, ledger mutation
//! 4. **Reply Policy** (`guardrails`) - Canned, augmented or pass-through text
//!
//! # Key Types
//!
//! - `OrderIntentPipeline` - Main orchestrator (see `runtime` module)
//! - `LlmClient` - Pluggable trait for OpenAI-compatible chat endpoints
//! - `SessionState` - Cart, transcript and request pacing for one guest
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. It NEVER decides prices, stock, or what
//! lands in the cart. Those are deterministic decisions made by foodie-core.

pub mod classifier;
pub mod guardrails;
pub mod http;
pub mod intent;
pub mod llm;
pub mod prompt;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use classifier::{ClassifierError, IntentClassifier, RateLimitAdvisory, RetryPolicy};
pub use http::HttpLlmClient;
pub use intent::{ClassifiedIntent, IntentKind};
pub use llm::LlmClient;
pub use runtime::{OrderIntentPipeline, PipelineResult, SessionState};
