pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use foodie_core::config::{AppConfig, ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "foodie",
    about = "Agentic Foodie ordering assistant CLI",
    long_about = "Browse the menu, inspect configuration, check readiness, and order through the conversational assistant.",
    after_help = "Examples:\n  foodie menu\n  foodie doctor --json\n  foodie ask \"I'd like two cheeseburgers\"\n  foodie chat"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a foodie.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Path to a menu TOML file (overrides config)")]
    menu: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level override (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Print the menu with prices, dietary badges and stock")]
    Menu {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, menu loading, and language model credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Classify one utterance against a fresh cart and print the structured result")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "What the guest says")]
        text: Vec<String>,
    },
    #[command(about = "Start an interactive ordering session on stdin/stdout")]
    Chat,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                menu_path: self.menu.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        logging::init_logging(&config);
    }

    let result = match cli.command {
        Command::Menu { json } => commands::menu::run(&options, json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(&options, json) }
        }
        Command::Ask { text } => commands::ask::run(&options, &text.join(" ")),
        Command::Chat => commands::chat::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
