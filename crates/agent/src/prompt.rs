use foodie_core::domain::conversation::{ConversationTurn, Role};
use foodie_core::domain::order::OrderLedger;
use foodie_core::ordering::catalog::MenuCatalog;
use serde_json::{json, Value};

use crate::llm::{ChatMessage, ChatRole};

pub const ASSISTANT_NAME: &str = "Agentic Foodie";

/// Everything the classifier prompt is built from for one utterance.
#[derive(Clone, Copy, Debug)]
pub struct PromptContext<'a> {
    pub catalog: &'a MenuCatalog,
    pub order: &'a OrderLedger,
    /// Prior turns, oldest first, not including `utterance`.
    pub history: &'a [ConversationTurn],
    pub utterance: &'a str,
}

pub fn build_messages(context: &PromptContext<'_>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(context.history.len() + 2);
    messages.push(ChatMessage::new(ChatRole::System, system_instruction(context.catalog, context.order)));

    for turn in context.history {
        let role = match turn.role {
            Role::User => ChatRole::User,
            Role::Agent => ChatRole::Assistant,
        };
        messages.push(ChatMessage::new(role, turn.text.clone()));
    }

    messages.push(ChatMessage::new(ChatRole::User, context.utterance));
    messages
}

pub fn order_json(order: &OrderLedger) -> Value {
    let mut lines = serde_json::Map::new();
    for line in order.lines() {
        lines.insert(
            line.item_id.to_string(),
            json!({
                "name": line.name,
                "price": line.unit_price.to_string(),
                "quantity": line.quantity,
            }),
        );
    }
    Value::Object(lines)
}

fn system_instruction(catalog: &MenuCatalog, order: &OrderLedger) -> String {
    format!(
        r#"You are a helpful and friendly restaurant ordering assistant named {ASSISTANT_NAME}.
Your goal is to take food orders, answer questions about the menu, and intelligently
recommend additional items, upgrades, or promotions to maximize the order value and customer satisfaction.

Current Menu (JSON): {menu}
Current Promotions (JSON): {promotions}
Current Order (JSON): {order}

Based on the user's input and the current conversation context, you MUST respond with a JSON object.
This JSON object should contain:
1. "intent": A string indicating the user's primary intent.
   Possible values: "order", "query_menu", "confirm", "cancel", "greeting", "farewell", "other", "thank_you".
2. "item_id": The 'id' of the menu item if the intent is "order" or "query_menu", otherwise null.
3. "quantity": An integer representing the quantity if the intent is "order", otherwise null.
4. "response_text": A natural language, conversational response for the user, including relevant emojis.
   Ensure this text is engaging and directly addresses the user's input.

**STRICT JSON OUTPUT REQUIREMENT:**
Your entire response MUST be a valid JSON object and contain ONLY the JSON. Do NOT include any other text, markdown, or explanations outside the JSON.
Example: {{"intent": "order", "item_id": "beef_burger", "quantity": 1, "response_text": "Great choice! Adding a Classic Beef Burger 🍔 to your order. Would you like some golden fries with that? 🍟"}}

**Recommendation Logic for "response_text":**
- After an item is ordered, suggest relevant upsells from its 'upsell' array.
- If a main course is ordered and no drink/dessert, suggest the "Combo Deal".
- If multiple items are in the cart, suggest a dessert.
- Be friendly, conversational, and use emojis.
- If the user asks about something not on the menu, politely state it's not available.
- If the user says "hello" or a greeting, respond with a friendly greeting.
- If the user says "thank you", respond appropriately."#,
        menu = catalog.menu_json(),
        promotions = catalog.promotions_json(),
        order = order_json(order),
    )
}
