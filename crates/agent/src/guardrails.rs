use crate::intent::{ClassifiedIntent, IntentKind};

pub const THANK_YOU_REPLY: &str = "You're most welcome! Is there anything else I can assist you with? 😊";
pub const GREETING_REPLY: &str = "Hello there! How can I help you with your order today? 🌟";
pub const FAREWELL_REPLY: &str = "Goodbye! Hope to serve you again soon! 👋";

/// What the pipeline does with the model's own reply text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyDecision {
    PassThrough,
    Augment { reason_code: &'static str, suffix: String },
    Override { reason_code: &'static str, user_message: String },
}

impl ReplyDecision {
    pub fn apply(self, model_reply: &str) -> String {
        match self {
            Self::PassThrough => model_reply.to_string(),
            Self::Augment { suffix, .. } => format!("{model_reply}{suffix}"),
            Self::Override { user_message, .. } => user_message,
        }
    }

    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::PassThrough => None,
            Self::Augment { reason_code, .. } | Self::Override { reason_code, .. } => Some(reason_code),
        }
    }
}

/// Replies the model is not trusted to phrase. Social intents always get the
/// house wording; cart outcomes are decided locally, not by the model's text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplyPolicy;

impl ReplyPolicy {
    pub fn for_intent(&self, intent: &ClassifiedIntent) -> ReplyDecision {
        let (reason_code, message) = match intent.kind {
            IntentKind::ThankYou => ("canned_thank_you", THANK_YOU_REPLY),
            IntentKind::Greeting => ("canned_greeting", GREETING_REPLY),
            IntentKind::Farewell => ("canned_farewell", FAREWELL_REPLY),
            _ => return ReplyDecision::PassThrough,
        };
        ReplyDecision::Override { reason_code, user_message: message.to_string() }
    }

    pub fn unknown_item(&self, message: String) -> ReplyDecision {
        ReplyDecision::Override { reason_code: "item_unknown", user_message: message }
    }

    pub fn out_of_stock(&self, message: String) -> ReplyDecision {
        ReplyDecision::Override { reason_code: "out_of_stock", user_message: message }
    }

    pub fn suggestion(&self, display_name: &str) -> ReplyDecision {
        ReplyDecision::Augment {
            reason_code: "upsell_suggestion",
            suffix: format!(" How about some {display_name} with that? 🍟"),
        }
    }
}
