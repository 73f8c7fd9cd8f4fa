use anyhow::{Context, Result};
use foodie_agent::{LlmClient, OrderIntentPipeline, SessionState};
use foodie_core::config::LoadOptions;
use foodie_core::domain::order::{LedgerChange, OrderLedger};
use foodie_core::ordering::pricing::{format_money, line_total};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::commands::menu::render_human;
use crate::commands::{bootstrap, build_pipeline, current_thread_runtime, CommandResult};

pub const MENU_PROMPT: &str = "What's on the menu?";
pub const PROMOTIONS_PROMPT: &str = "Are there any promotions?";
pub const RECOMMEND_PROMPT: &str = "Can you recommend something?";

const HELP: &str = "commands: /cart /add <id> [qty] /qty <id> <n> /remove <id> /place /menu /suggest menu|promotions|recommend /help /quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatInput {
    Say(String),
    Cart,
    Add { item_id: String, quantity: u32 },
    SetQuantity { item_id: String, quantity: i64 },
    Remove { item_id: String },
    Place,
    Menu,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args = parts.collect::<Vec<_>>();

        match (name.as_str(), args.as_slice()) {
            ("cart", []) => Self::Cart,
            ("place", []) => Self::Place,
            ("menu", []) => Self::Menu,
            ("help", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            ("add", [item_id]) => Self::Add { item_id: item_id.to_string(), quantity: 1 },
            ("add", [item_id, quantity]) => match quantity.parse::<u32>() {
                Ok(quantity) if quantity > 0 => Self::Add { item_id: item_id.to_string(), quantity },
                _ => Self::Invalid(format!("`{quantity}` is not a positive quantity")),
            },
            ("qty", [item_id, quantity]) => match quantity.parse::<i64>() {
                Ok(quantity) => Self::SetQuantity { item_id: item_id.to_string(), quantity },
                Err(_) => Self::Invalid(format!("`{quantity}` is not a quantity")),
            },
            ("remove", [item_id]) => Self::Remove { item_id: item_id.to_string() },
            ("suggest", [topic]) => match topic.to_ascii_lowercase().as_str() {
                "menu" => Self::Say(MENU_PROMPT.to_string()),
                "promotions" => Self::Say(PROMOTIONS_PROMPT.to_string()),
                "recommend" => Self::Say(RECOMMEND_PROMPT.to_string()),
                other => Self::Invalid(format!("unknown suggestion `{other}`")),
            },
            _ => Self::Invalid(format!("unrecognized command `/{command}`")),
        }
    }
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let pipeline = match bootstrap(options).and_then(build_pipeline) {
        Ok(pipeline) => pipeline,
        Err(error) => return CommandResult::from_application_error("chat", &error),
    };
    let runtime = match current_thread_runtime("chat") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let outcome = runtime.block_on(async {
        let mut session = SessionState::new();
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        run_session(&pipeline, &mut session, stdin, &mut stdout).await
    });

    match outcome {
        Ok(turns) => CommandResult::success("chat", format!("session ended after {turns} turns")),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 6),
    }
}

/// Drives one session until `/quit` or end of input. Returns the number of
/// utterances sent to the assistant.
pub async fn run_session<L, R, W>(
    pipeline: &OrderIntentPipeline<L>,
    session: &mut SessionState,
    reader: R,
    writer: &mut W,
) -> Result<usize>
where
    L: LlmClient,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Some(welcome) = session.history.last() {
        write_line(writer, &format!("foodie> {}", welcome.text)).await?;
    }

    let mut lines = reader.lines();
    let mut turns = 0;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        let response = match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Help => HELP.to_string(),
            ChatInput::Invalid(reason) => format!("{reason}; {HELP}"),
            ChatInput::Menu => render_human(pipeline.catalog(), pipeline.availability()),
            ChatInput::Cart => render_cart(&session.ledger),
            ChatInput::Say(text) => match pipeline.handle(&text, session).await {
                Some(result) => {
                    turns += 1;
                    let mut response = format!("foodie> {}", result.reply);
                    if let Some(advisory) = result.advisory {
                        response.push_str(&format!(
                            "\n(note: only {} model requests left in the current window)",
                            advisory.remaining_requests
                        ));
                    }
                    response
                }
                None => continue,
            },
            ChatInput::Add { item_id, quantity } => {
                match pipeline.add_item(session, &item_id, quantity) {
                    Ok(change) => describe_change(pipeline, &change),
                    Err(error) => error.user_message(Some(pipeline.display_name(&item_id))),
                }
            }
            ChatInput::SetQuantity { item_id, quantity } => {
                let change = pipeline.set_quantity(session, &item_id, quantity);
                describe_change(pipeline, &change)
            }
            ChatInput::Remove { item_id } => {
                let change = pipeline.remove_item(session, &item_id);
                describe_change(pipeline, &change)
            }
            ChatInput::Place => match pipeline.place_order(session) {
                Some(placed) => format!("foodie> {}", placed.confirmation_message()),
                None => "Your cart is empty. 🛒".to_string(),
            },
        };

        write_line(writer, &response).await?;
    }

    writer.flush().await.context("failed to flush output")?;
    Ok(turns)
}

pub fn render_cart(ledger: &OrderLedger) -> String {
    if ledger.is_empty() {
        return "Your cart is empty. 🛒".to_string();
    }

    let mut lines = ledger
        .lines()
        .iter()
        .map(|line| {
            format!(
                "- {} x {} @ {} = {}",
                line.quantity,
                line.name,
                format_money(line.unit_price),
                format_money(line_total(line))
            )
        })
        .collect::<Vec<_>>();

    let totals = ledger.totals();
    lines.push(format!("subtotal {}", format_money(totals.subtotal)));
    lines.push(format!("tax (8%) {}", format_money(totals.tax)));
    lines.push(format!("total {}", format_money(totals.grand_total)));
    lines.join("\n")
}

fn describe_change<L: LlmClient>(pipeline: &OrderIntentPipeline<L>, change: &LedgerChange) -> String {
    match change {
        LedgerChange::Added { item_id, quantity } => {
            format!("added {quantity} x {}", pipeline.display_name(item_id.as_str()))
        }
        LedgerChange::Updated { item_id, quantity } => {
            format!("{} now x {quantity}", pipeline.display_name(item_id.as_str()))
        }
        LedgerChange::Removed { item_id } => {
            format!("removed {}", pipeline.display_name(item_id.as_str()))
        }
        LedgerChange::Unchanged => "cart unchanged".to_string(),
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> Result<()> {
    writer.write_all(text.as_bytes()).await.context("failed to write output")?;
    writer.write_all(b"\n").await.context("failed to write output")?;
    Ok(())
}
