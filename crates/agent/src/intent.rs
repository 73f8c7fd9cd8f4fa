use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_REPLY: &str = "I'm not sure how to respond to that. 🤔";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Order,
    QueryMenu,
    Confirm,
    Cancel,
    Greeting,
    Farewell,
    ThankYou,
    Other,
    /// Local failure marker. Never accepted from the model.
    Error,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::QueryMenu => "query_menu",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
            Self::ThankYou => "thank_you",
            Self::Other => "other",
            Self::Error => "error",
        }
    }

    /// Maps a model-supplied label. Unknown labels, and `error`, become `Other`.
    pub fn from_model_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "order" => Self::Order,
            "query_menu" => Self::QueryMenu,
            "confirm" => Self::Confirm,
            "cancel" => Self::Cancel,
            "greeting" => Self::Greeting,
            "farewell" => Self::Farewell,
            "thank_you" => Self::ThankYou,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub kind: IntentKind,
    pub item_id: Option<String>,
    /// Signed cart delta; negative values take items back out.
    pub quantity: i64,
    pub reply: String,
}

impl ClassifiedIntent {
    pub fn error(reply: impl Into<String>) -> Self {
        Self { kind: IntentKind::Error, item_id: None, quantity: 1, reply: reply.into() }
    }

    pub fn is_error(&self) -> bool {
        self.kind == IntentKind::Error
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentParseError {
    #[error("completion body is not JSON: {0}")]
    Envelope(String),
    #[error("completion body has no `choices[0].message.content` string")]
    MissingContent,
    #[error("message content is not a JSON object: {0}")]
    Content(String),
}

/// Parses a chat completion body whose message content is itself a JSON
/// document. Missing or mistyped inner fields fall back to defaults.
pub fn parse_completion(body: &str) -> Result<ClassifiedIntent, IntentParseError> {
    let envelope: Value =
        serde_json::from_str(body).map_err(|error| IntentParseError::Envelope(error.to_string()))?;

    let content = envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or(IntentParseError::MissingContent)?;

    parse_intent_document(content)
}

pub fn parse_intent_document(content: &str) -> Result<ClassifiedIntent, IntentParseError> {
    let document: Value = serde_json::from_str(content.trim())
        .map_err(|error| IntentParseError::Content(error.to_string()))?;
    let Value::Object(fields) = document else {
        return Err(IntentParseError::Content("expected an object".to_string()));
    };

    let kind = fields
        .get("intent")
        .and_then(Value::as_str)
        .map(IntentKind::from_model_label)
        .unwrap_or(IntentKind::Other);

    let item_id = fields
        .get("item_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let quantity = fields.get("quantity").and_then(parse_quantity).unwrap_or(1);

    let reply = fields
        .get("response_text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(DEFAULT_REPLY)
        .to_string();

    Ok(ClassifiedIntent { kind, item_id, quantity, reply })
}

fn parse_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}
