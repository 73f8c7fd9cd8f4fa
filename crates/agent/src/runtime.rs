use std::sync::Arc;

use foodie_core::domain::conversation::{ConversationHistory, ConversationTurn};
use foodie_core::domain::order::{LedgerChange, OrderLedger, PlacedOrder};
use foodie_core::errors::DomainError;
use foodie_core::ordering::availability::{AvailabilityService, StaticInventory};
use foodie_core::ordering::catalog::MenuCatalog;
use foodie_core::ordering::recommendation::{AnchorRecommendation, RecommendationService};
use foodie_core::ordering::Storefront;
use tracing::{debug, info};

use crate::classifier::{ClassifierError, IntentClassifier, RateLimitAdvisory, RequestPacer};
use crate::guardrails::{ReplyDecision, ReplyPolicy};
use crate::intent::{ClassifiedIntent, IntentKind};
use crate::llm::LlmClient;
use crate::prompt::PromptContext;

/// Everything one guest conversation owns. Sessions never share state.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub ledger: OrderLedger,
    pub history: ConversationHistory,
    pub pacer: RequestPacer,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            ledger: OrderLedger::new(),
            history: ConversationHistory::with_welcome(),
            pacer: RequestPacer::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineResult {
    pub intent: ClassifiedIntent,
    pub reply: String,
    pub reason_code: Option<&'static str>,
    pub ledger_change: Option<LedgerChange>,
    pub suggestion: Option<String>,
    pub advisory: Option<RateLimitAdvisory>,
    pub failure: Option<ClassifierError>,
}

/// Classifies each utterance, applies order intents to the cart, and decides
/// the reply. Classifier failures end up as reply text, never as errors.
pub struct OrderIntentPipeline<L, A = StaticInventory, R = AnchorRecommendation> {
    classifier: IntentClassifier<L>,
    catalog: Arc<MenuCatalog>,
    availability: A,
    recommender: R,
    replies: ReplyPolicy,
    history_window: Option<usize>,
}

impl<L> OrderIntentPipeline<L>
where
    L: LlmClient,
{
    pub fn from_storefront(classifier: IntentClassifier<L>, storefront: Storefront) -> Self {
        Self::new(
            classifier,
            Arc::new(storefront.catalog),
            storefront.inventory,
            AnchorRecommendation::default(),
        )
    }
}

impl<L, A, R> OrderIntentPipeline<L, A, R>
where
    L: LlmClient,
    A: AvailabilityService,
    R: RecommendationService,
{
    pub fn new(
        classifier: IntentClassifier<L>,
        catalog: Arc<MenuCatalog>,
        availability: A,
        recommender: R,
    ) -> Self {
        Self {
            classifier,
            catalog,
            availability,
            recommender,
            replies: ReplyPolicy,
            history_window: None,
        }
    }

    /// Caps how many prior turns are replayed into each prompt.
    pub fn with_history_window(mut self, window: Option<usize>) -> Self {
        self.history_window = window;
        self
    }

    pub fn catalog(&self) -> &MenuCatalog {
        &self.catalog
    }

    pub fn availability(&self) -> &A {
        &self.availability
    }

    pub fn classifier(&self) -> &IntentClassifier<L> {
        &self.classifier
    }

    /// Handles one utterance. Blank input is ignored and returns `None`.
    pub async fn handle(&self, utterance: &str, session: &mut SessionState) -> Option<PipelineResult> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            debug!(event_name = "agent.pipeline.blank_utterance", "ignored blank utterance");
            return None;
        }

        let prior_turns = session.history.len();
        session.history.push(ConversationTurn::user(utterance));

        let outcome = {
            let history = replay_window(&session.history.turns()[..prior_turns], self.history_window);
            let context = PromptContext {
                catalog: &self.catalog,
                order: &session.ledger,
                history,
                utterance,
            };
            self.classifier.classify(&context, &mut session.pacer).await
        };

        let intent = outcome.intent;
        let mut ledger_change = None;
        let mut suggestion = None;

        let decision = match (intent.kind, intent.item_id.as_deref()) {
            (IntentKind::Order, Some(item_id)) => {
                match self.apply_order(item_id, intent.quantity, &mut session.ledger) {
                    Ok((change, suggested)) => {
                        ledger_change = Some(change);
                        match suggested {
                            Some((suggested_id, display_name)) => {
                                suggestion = Some(suggested_id);
                                self.replies.suggestion(&display_name)
                            }
                            None => ReplyDecision::PassThrough,
                        }
                    }
                    Err(rejection) => rejection,
                }
            }
            _ => self.replies.for_intent(&intent),
        };

        let reason_code = decision.reason_code();
        let reply = decision.apply(&intent.reply);
        session.history.push(ConversationTurn::agent(reply.clone()));

        info!(
            event_name = "agent.pipeline.turn_handled",
            intent = intent.kind.as_str(),
            reason_code = reason_code.unwrap_or("none"),
            error_class = outcome.failure.as_ref().map(ClassifierError::error_class).unwrap_or("none"),
            cart_lines = session.ledger.len(),
            "utterance handled"
        );

        Some(PipelineResult {
            intent,
            reply,
            reason_code,
            ledger_change,
            suggestion,
            advisory: outcome.advisory,
            failure: outcome.failure,
        })
    }

    /// Manual cart addition; stock is checked the same way as for spoken orders.
    pub fn add_item(
        &self,
        session: &mut SessionState,
        item_id: &str,
        quantity: u32,
    ) -> Result<LedgerChange, DomainError> {
        if !self.catalog.contains(item_id) {
            return Err(DomainError::ItemUnknown(item_id.to_string()));
        }
        if !self.availability.is_available(item_id) {
            return Err(DomainError::OutOfStock(item_id.to_string()));
        }
        session.ledger.add_or_increment(&self.catalog, item_id, i64::from(quantity))
    }

    pub fn set_quantity(&self, session: &mut SessionState, item_id: &str, quantity: i64) -> LedgerChange {
        session.ledger.set_quantity(item_id, quantity)
    }

    pub fn remove_item(&self, session: &mut SessionState, item_id: &str) -> LedgerChange {
        session.ledger.remove(item_id)
    }

    /// Places the cart and records the confirmation as an agent turn.
    pub fn place_order(&self, session: &mut SessionState) -> Option<PlacedOrder> {
        let placed = session.ledger.place_order()?;
        session.history.push(ConversationTurn::agent(placed.confirmation_message()));
        info!(
            event_name = "agent.pipeline.order_placed",
            order_id = %placed.order_id,
            lines = placed.lines.len(),
            grand_total = %placed.totals.rounded().grand_total,
            "order sent to the kitchen"
        );
        Some(placed)
    }

    /// The display name of `item_id`, falling back to the id itself.
    pub fn display_name<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.catalog.lookup(item_id).map(|item| item.name.as_str()).unwrap_or(item_id)
    }

    fn apply_order(
        &self,
        item_id: &str,
        delta: i64,
        ledger: &mut OrderLedger,
    ) -> Result<(LedgerChange, Option<(String, String)>), ReplyDecision> {
        let Some(item) = self.catalog.lookup(item_id) else {
            let error = DomainError::ItemUnknown(item_id.to_string());
            debug!(event_name = "agent.pipeline.item_unknown", item_id, "model named an unknown item");
            return Err(self.replies.unknown_item(error.user_message(None)));
        };

        if delta > 0 && !self.availability.is_available(item_id) {
            let error = DomainError::OutOfStock(item_id.to_string());
            debug!(event_name = "agent.pipeline.out_of_stock", item_id, "ordered item is out of stock");
            return Err(self.replies.out_of_stock(error.user_message(Some(&item.name))));
        }

        let change = ledger
            .add_or_increment(&self.catalog, item_id, delta)
            .map_err(|error| self.replies.unknown_item(error.user_message(None)))?;

        if delta <= 0 {
            return Ok((change, None));
        }

        let suggestion = self.recommender.suggest(ledger).and_then(|suggested| {
            let name = self.catalog.lookup(&suggested)?.name.clone();
            Some((suggested, name))
        });

        Ok((change, suggestion))
    }
}

fn replay_window(turns: &[ConversationTurn], window: Option<usize>) -> &[ConversationTurn] {
    match window {
        Some(window) if window < turns.len() => &turns[turns.len() - window..],
        _ => turns,
    }
}

#[cfg(test)]
mod tests {
    use foodie_core::domain::conversation::{Role, WELCOME_MESSAGE};
    use foodie_core::domain::menu::{ItemId, MenuDocument};
    use foodie_core::domain::order::LedgerChange;
    use foodie_core::errors::DomainError;
    use foodie_core::ordering::Storefront;
    use rust_decimal::Decimal;

    use super::{OrderIntentPipeline, SessionState};
    use crate::classifier::{
        ClassifierError, IntentClassifier, ModelSettings, RetryPolicy, GENERIC_FAILURE_REPLY,
        HIGH_DEMAND_REPLY, NOT_CONFIGURED_REPLY,
    };
    use crate::guardrails::THANK_YOU_REPLY;
    use crate::intent::IntentKind;
    use crate::testing::{completion_body, ScriptedLlm, ScriptedReply};

    fn pipeline(client: ScriptedLlm) -> OrderIntentPipeline<ScriptedLlm> {
        let storefront =
            Storefront::from_document(MenuDocument::builtin().expect("builtin menu")).expect("storefront");
        let classifier = IntentClassifier::new(
            client,
            ModelSettings { model: "llama3-8b-8192".to_string(), temperature: 0.7, max_tokens: 250 },
            RetryPolicy::default(),
        );
        OrderIntentPipeline::from_storefront(classifier, storefront)
    }

    fn reply(content: &str) -> ScriptedReply {
        ScriptedReply::ok(completion_body(content))
    }

    #[tokio::test(start_paused = true)]
    async fn two_cheeseburgers_land_in_the_cart_with_fries_suggestion() {
        let client = ScriptedLlm::new(vec![reply(
            r#"{"intent":"order","item_id":"beef_burger","quantity":2,"response_text":"Two Classic Cheeseburgers coming up! 🍔"}"#,
        )]);
        let pipeline = pipeline(client);
        let mut session = SessionState::new();

        let result = pipeline.handle("I'd like two cheeseburgers", &mut session).await.expect("handled");

        assert_eq!(result.intent.kind, IntentKind::Order);
        assert_eq!(
            result.ledger_change,
            Some(LedgerChange::Added { item_id: ItemId::from("beef_burger"), quantity: 2 })
        );
        assert_eq!(result.suggestion.as_deref(), Some("golden_fries"));
        assert_eq!(
            result.reply,
            "Two Classic Cheeseburgers coming up! 🍔 How about some Golden Fries with that? 🍟"
        );

        let line = session.ledger.line("beef_burger").expect("line present");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price, Decimal::new(1299, 2));

        let totals = session.ledger.totals();
        assert_eq!(totals.subtotal, Decimal::new(2598, 2));
        assert_eq!(totals.tax, Decimal::new(20784, 4));
        assert_eq!(totals.grand_total, Decimal::new(280584, 4));

        let turns = session.history.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].text, WELCOME_MESSAGE);
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[2].role, Role::Agent);
        assert_eq!(turns[2].text, result.reply);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_item_leaves_cart_untouched() {
        let client = ScriptedLlm::new(vec![reply(
            r#"{"intent":"order","item_id":"sushi_platter","quantity":1,"response_text":"Added sushi!"}"#,
        )]);
        let pipeline = pipeline(client);
        let mut session = SessionState::new();

        let result = pipeline.handle("one sushi platter", &mut session).await.expect("handled");

        assert!(session.ledger.is_empty());
        assert_eq!(result.ledger_change, None);
        assert_eq!(result.reason_code, Some("item_unknown"));
        assert_eq!(result.reply, "Sorry, we don't have sushi_platter on our menu. 🤔");
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_stock_item_is_refused_by_name() {
        let client = ScriptedLlm::new(vec![reply(
            r#"{"intent":"order","item_id":"golden_fries","quantity":1,"response_text":"Fries added!"}"#,
        )]);
        let pipeline = pipeline(client);
        let mut session = SessionState::new();

        let result = pipeline.handle("fries please", &mut session).await.expect("handled");

        assert!(session.ledger.is_empty());
        assert_eq!(result.reply, "Sorry, Golden Fries is out of stock. 🛑");
        assert_eq!(result.reason_code, Some("out_of_stock"));
    }

    #[tokio::test(start_paused = true)]
    async fn order_without_anchor_passes_model_text_through() {
        let client = ScriptedLlm::new(vec![reply(
            r#"{"intent":"order","item_id":"margherita_pizza","quantity":1,"response_text":"One Margherita! 🍕"}"#,
        )]);
        let pipeline = pipeline(client);
        let mut session = SessionState::new();

        let result = pipeline.handle("a margherita", &mut session).await.expect("handled");

        assert_eq!(result.reply, "One Margherita! 🍕");
        assert_eq!(result.suggestion, None);
        assert_eq!(session.ledger.line("margherita_pizza").map(|line| line.quantity), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn negative_quantity_takes_items_back_out() {
        let client = ScriptedLlm::new(vec![
            reply(
                r#"{"intent":"order","item_id":"beef_burger","quantity":-1,"response_text":"One less burger."}"#,
            ),
            reply(
                r#"{"intent":"order","item_id":"beef_burger","quantity":-1,"response_text":"Burger removed."}"#,
            ),
        ]);
        let pipeline = pipeline(client);
        let mut session = SessionState::new();
        pipeline.add_item(&mut session, "beef_burger", 2).expect("in stock");

        let first = pipeline.handle("take one burger off", &mut session).await.expect("handled");
        assert_eq!(
            first.ledger_change,
            Some(LedgerChange::Updated { item_id: ItemId::from("beef_burger"), quantity: 1 })
        );
        assert_eq!(first.suggestion, None);
        assert_eq!(first.reply, "One less burger.");
        assert_eq!(session.ledger.line("beef_burger").map(|line| line.quantity), Some(1));

        let second = pipeline.handle("and the other one", &mut session).await.expect("handled");
        assert_eq!(
            second.ledger_change,
            Some(LedgerChange::Removed { item_id: ItemId::from("beef_burger") })
        );
        assert!(session.ledger.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn decrementing_an_out_of_stock_item_is_not_refused() {
        let client = ScriptedLlm::new(vec![reply(
            r#"{"intent":"order","item_id":"golden_fries","quantity":-1,"response_text":"No fries then."}"#,
        )]);
        let pipeline = pipeline(client);
        let mut session = SessionState::new();

        let result = pipeline.handle("no fries", &mut session).await.expect("handled");

        assert_eq!(result.reason_code, None);
        assert_eq!(result.ledger_change, Some(LedgerChange::Unchanged));
        assert_eq!(result.reply, "No fries then.");
    }

    #[tokio::test(start_paused = true)]
    async fn order_succeeds_after_two_throttled_attempts() {
        let client = ScriptedLlm::new(vec![
            ScriptedReply::throttled(None),
            ScriptedReply::throttled(None),
            reply(
                r#"{"intent":"order","item_id":"margherita_pizza","quantity":1,"response_text":"One Margherita! 🍕"}"#,
            ),
        ]);
        let pipeline = pipeline(client.clone());
        let mut session = SessionState::new();

        let result = pipeline.handle("a margherita", &mut session).await.expect("handled");

        assert_eq!(client.calls(), 3);
        assert_eq!(result.failure, None);
        assert_eq!(result.intent.kind, IntentKind::Order);
        assert_eq!(result.reply, "One Margherita! 🍕");
        assert_eq!(session.ledger.line("margherita_pizza").map(|line| line.quantity), Some(1));
        assert_eq!(session.history.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_reply_with_high_demand_and_leave_cart_alone() {
        let client = ScriptedLlm::new(vec![
            ScriptedReply::throttled(None),
            ScriptedReply::throttled(None),
            ScriptedReply::throttled(None),
        ]);
        let pipeline = pipeline(client.clone());
        let mut session = SessionState::new();
        pipeline.add_item(&mut session, "beef_burger", 1).expect("in stock");

        let result = pipeline.handle("two more burgers", &mut session).await.expect("handled");

        assert_eq!(client.calls(), 3);
        assert_eq!(result.failure, Some(ClassifierError::UpstreamUnavailable { attempts: 3 }));
        assert_eq!(result.intent.kind, IntentKind::Error);
        assert_eq!(result.reply, HIGH_DEMAND_REPLY);
        assert_eq!(result.ledger_change, None);
        assert_eq!(session.ledger.line("beef_burger").map(|line| line.quantity), Some(1));

        let turns = session.history.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].text, "two more burgers");
        assert_eq!(turns[2].text, HIGH_DEMAND_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn thank_you_gets_canned_reply_whatever_the_model_says() {
        let client = ScriptedLlm::new(vec![reply(
            r#"{"intent":"thank_you","item_id":null,"quantity":null,"response_text":"np lol"}"#,
        )]);
        let pipeline = pipeline(client);
        let mut session = SessionState::new();

        let result = pipeline.handle("thanks!", &mut session).await.expect("handled");

        assert_eq!(result.intent.kind, IntentKind::ThankYou);
        assert_eq!(result.reply, THANK_YOU_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn classifier_failure_still_records_both_turns() {
        let client = ScriptedLlm::new(vec![ScriptedReply::status(503)]);
        let pipeline = pipeline(client);
        let mut session = SessionState::new();

        let result = pipeline.handle("what's good?", &mut session).await.expect("handled");

        assert_eq!(result.failure, Some(ClassifierError::UpstreamStatus { status: 503 }));
        assert_eq!(result.reply, GENERIC_FAILURE_REPLY);
        assert_eq!(session.history.len(), 3);
        assert_eq!(session.history.turns()[1].text, "what's good?");
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_classifier_keeps_manual_cart_working() {
        let pipeline = pipeline(ScriptedLlm::unconfigured());
        let mut session = SessionState::new();

        let result = pipeline.handle("hello", &mut session).await.expect("handled");
        assert_eq!(result.reply, NOT_CONFIGURED_REPLY);

        let change = pipeline.add_item(&mut session, "beef_burger", 1).expect("in stock");
        assert_eq!(change, LedgerChange::Added { item_id: ItemId::from("beef_burger"), quantity: 1 });
        assert_eq!(
            pipeline.add_item(&mut session, "golden_fries", 1),
            Err(DomainError::OutOfStock("golden_fries".to_string()))
        );
        assert_eq!(
            pipeline.add_item(&mut session, "tiramisu", 1),
            Err(DomainError::ItemUnknown("tiramisu".to_string()))
        );

        pipeline.set_quantity(&mut session, "beef_burger", 3);
        assert_eq!(session.ledger.line("beef_burger").map(|line| line.quantity), Some(3));
        pipeline.remove_item(&mut session, "beef_burger");
        assert!(session.ledger.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_utterances_are_ignored() {
        let client = ScriptedLlm::new(Vec::new());
        let pipeline = pipeline(client.clone());
        let mut session = SessionState::new();

        assert_eq!(pipeline.handle("   \n", &mut session).await, None);
        assert_eq!(session.history.len(), 1);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_replays_prior_turns_within_window() {
        let client = ScriptedLlm::new(vec![
            reply(r#"{"intent":"greeting","response_text":"hey"}"#),
            reply(r#"{"intent":"query_menu","response_text":"We have burgers."}"#),
        ]);
        let pipeline = pipeline(client.clone()).with_history_window(Some(2));
        let mut session = SessionState::new();

        pipeline.handle("hi", &mut session).await.expect("handled");
        pipeline.handle("what's on the menu?", &mut session).await.expect("handled");

        let requests = client.requests();
        // system + welcome + utterance
        assert_eq!(requests[0].messages.len(), 3);
        // system + last two prior turns + utterance
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[1].messages[1].content, "hi");
        assert_eq!(requests[1].messages[3].content, "what's on the menu?");
        assert_eq!(session.history.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn placing_an_order_confirms_and_clears_the_cart() {
        let pipeline = pipeline(ScriptedLlm::new(Vec::new()));
        let mut session = SessionState::new();
        pipeline.add_item(&mut session, "beef_burger", 2).expect("in stock");

        let placed = pipeline.place_order(&mut session).expect("order placed");

        assert!(session.ledger.is_empty());
        assert_eq!(placed.lines.len(), 1);
        let confirmation = session.history.last().expect("confirmation turn");
        assert_eq!(confirmation.role, Role::Agent);
        assert_eq!(
            confirmation.text,
            "Thank you for your order! You've ordered: 2 x Classic Cheeseburger. Your total is $28.06. Your order has been sent to the kitchen. Enjoy your meal! 🥳"
        );
        assert_eq!(pipeline.place_order(&mut session), None);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let pipeline = pipeline(ScriptedLlm::new(Vec::new()));
        assert_eq!(pipeline.display_name("golden_fries"), "Golden Fries");
        assert_eq!(pipeline.display_name("mystery"), "mystery");
    }
}
