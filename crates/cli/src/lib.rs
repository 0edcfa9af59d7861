pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "minerbot",
    about = "MinerBot operator CLI",
    long_about = "Operate the MinerBot HR assistant: migrations, demo directory seeding, config inspection, password provisioning and a local console chat.",
    after_help = "Examples:\n  minerbot migrate\n  minerbot seed\n  minerbot hash-password 'Cobre#2026'\n  minerbot chat"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the demo employee directory")]
    Seed {
        #[arg(long, default_value_t = minerbot_db::credentials::DEFAULT_HASH_COST, help = "bcrypt cost for the demo password hashes")]
        hash_cost: u32,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print a bcrypt hash suitable for employees.password_hash")]
    HashPassword {
        password: String,
        #[arg(long, default_value_t = minerbot_db::credentials::DEFAULT_HASH_COST)]
        cost: u32,
    },
    #[command(about = "Talk to the bot from the terminal using the configured database and connectors")]
    Chat {
        #[arg(long, help = "Resume an existing conversation instead of starting a new one")]
        conversation_id: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { hash_cost } => commands::seed::run(hash_cost),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::HashPassword { password, cost } => commands::hash_password::run(&password, cost),
        Command::Chat { conversation_id } => commands::chat::run(conversation_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
