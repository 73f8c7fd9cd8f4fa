pub mod ask;
pub mod chat;
pub mod config;
pub mod doctor;
pub mod menu;

use foodie_agent::{HttpLlmClient, IntentClassifier, OrderIntentPipeline};
use foodie_core::config::{AppConfig, LoadOptions};
use foodie_core::domain::menu::MenuDocument;
use foodie_core::errors::ApplicationError;
use foodie_core::ordering::Storefront;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    pub fn from_application_error(command: &str, error: &ApplicationError) -> Self {
        let exit_code = match error {
            ApplicationError::Configuration(_) => 2,
            ApplicationError::Domain(_) => 4,
            ApplicationError::Integration(_) => 3,
        };
        Self::failure(command, error.error_class(), error.to_string(), exit_code)
    }

    fn payload(exit_code: u8, payload: &impl Serialize) -> Self {
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: &impl Serialize) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loaded config plus the storefront built from its menu.
pub(crate) struct Bootstrap {
    pub config: AppConfig,
    pub storefront: Storefront,
}

pub(crate) fn bootstrap(options: &LoadOptions) -> Result<Bootstrap, ApplicationError> {
    let config = AppConfig::load(options.clone())
        .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
    let document = MenuDocument::load(config.menu.path.as_deref())
        .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
    let storefront = Storefront::from_document(document)?;
    Ok(Bootstrap { config, storefront })
}

pub(crate) fn build_pipeline(
    bootstrap: Bootstrap,
) -> Result<OrderIntentPipeline<HttpLlmClient>, ApplicationError> {
    let client = HttpLlmClient::from_config(&bootstrap.config.llm)
        .map_err(|error| ApplicationError::Integration(error.to_string()))?;
    let classifier = IntentClassifier::from_config(client, &bootstrap.config.llm);
    Ok(OrderIntentPipeline::from_storefront(classifier, bootstrap.storefront)
        .with_history_window(bootstrap.config.session.history_window()))
}

pub(crate) fn current_thread_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}
