use serde::{Deserialize, Serialize};

pub const WELCOME_MESSAGE: &str = "Hello! 👋 Welcome to Agentic Foodie! I'm your voice-powered assistant ready to help you order from our delicious menu 🍽️ and suggest great additions. How can I help you today? 🗣️";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self { role: Role::Agent, text: text.into() }
    }
}

/// Append-only transcript of one session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_welcome() -> Self {
        let mut history = Self::new();
        history.push(ConversationTurn::agent(WELCOME_MESSAGE));
        history
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The most recent `window` turns, or all of them when `window` is `None`.
    pub fn recent(&self, window: Option<usize>) -> &[ConversationTurn] {
        match window {
            Some(window) if window < self.turns.len() => &self.turns[self.turns.len() - window..],
            _ => &self.turns,
        }
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
