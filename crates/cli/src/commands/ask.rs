use foodie_agent::{RateLimitAdvisory, SessionState};
use foodie_core::config::LoadOptions;
use foodie_core::domain::order::{LedgerChange, OrderLine};
use foodie_core::ordering::pricing::format_money;
use serde::Serialize;

use crate::commands::{bootstrap, build_pipeline, current_thread_runtime, CommandResult};

#[derive(Debug, Serialize)]
struct TotalsView {
    subtotal: String,
    tax: String,
    grand_total: String,
}

#[derive(Debug, Serialize)]
struct AskOutcome<'a> {
    command: &'static str,
    status: &'static str,
    error_class: Option<&'static str>,
    intent: &'static str,
    item_id: Option<String>,
    quantity: i64,
    reply: String,
    ledger_change: Option<LedgerChange>,
    suggestion: Option<String>,
    advisory: Option<RateLimitAdvisory>,
    cart: &'a [OrderLine],
    totals: TotalsView,
}

pub fn run(options: &LoadOptions, text: &str) -> CommandResult {
    let pipeline = match bootstrap(options).and_then(build_pipeline) {
        Ok(pipeline) => pipeline,
        Err(error) => return CommandResult::from_application_error("ask", &error),
    };
    let runtime = match current_thread_runtime("ask") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let mut session = SessionState::new();
    let Some(result) = runtime.block_on(pipeline.handle(text, &mut session)) else {
        return CommandResult::failure("ask", "empty_utterance", "nothing to classify", 64);
    };

    let totals = session.ledger.totals();
    let error_class = result.failure.as_ref().map(|failure| failure.error_class());
    let exit_code = if error_class.is_some() { 5 } else { 0 };

    CommandResult::payload(
        exit_code,
        &AskOutcome {
            command: "ask",
            status: if error_class.is_some() { "error" } else { "ok" },
            error_class,
            intent: result.intent.kind.as_str(),
            item_id: result.intent.item_id,
            quantity: result.intent.quantity,
            reply: result.reply,
            ledger_change: result.ledger_change,
            suggestion: result.suggestion,
            advisory: result.advisory,
            cart: session.ledger.lines(),
            totals: TotalsView {
                subtotal: format_money(totals.subtotal),
                tax: format_money(totals.tax),
                grand_total: format_money(totals.grand_total),
            },
        },
    )
}
