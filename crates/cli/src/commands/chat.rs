use std::io::{self, BufRead, Write};

use minerbot_core::{ApplicationError, ConversationEngine};
use minerbot_db::{connect_from_config, migrations};
use minerbot_server::bootstrap::build_engine;
use thiserror::Error;
use uuid::Uuid;

use crate::commands::{load_config, CommandResult};

const EXIT_COMMANDS: [&str; 2] = ["/salir", "/exit"];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("console i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("turn failed: {0}")]
    Turn(#[from] ApplicationError),
}

pub fn run(conversation_id: Option<String>) -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    // Multi-threaded so spawned interaction logs progress while waiting on stdin.
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let conversation_id =
        conversation_id.unwrap_or_else(|| format!("console-{}", Uuid::new_v4()));

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let engine = build_engine(&config, pool.clone())
            .map_err(|error| ("bootstrap", error.to_string(), 5u8))?;

        let stdin = io::stdin();
        let stdout = io::stdout();
        let turns = run_session(&engine, &conversation_id, stdin.lock(), stdout.lock())
            .await
            .map_err(|error| ("session", error.to_string(), 6u8));

        pool.close().await;
        turns
    });

    match result {
        Ok(turns) => CommandResult::success(
            "chat",
            format!("conversation {conversation_id} ended after {turns} turns"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}

/// Opens (or resumes) the conversation and relays lines until EOF or an exit
/// command. Returns the number of message turns.
pub async fn run_session<R, W>(
    engine: &ConversationEngine,
    conversation_id: &str,
    mut input: R,
    mut output: W,
) -> Result<usize, SessionError>
where
    R: BufRead,
    W: Write,
{
    let opening = engine.handle_conversation_start(conversation_id).await?;
    write_replies(&mut output, &opening.messages())?;

    let mut turns = 0;
    let mut line = String::new();
    loop {
        write!(output, "tú> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim_end_matches(['\r', '\n']);
        if EXIT_COMMANDS.contains(&text.trim()) {
            break;
        }

        let reply = engine.handle_message(conversation_id, text).await?;
        write_replies(&mut output, &reply.messages())?;
        turns += 1;
    }

    writeln!(output)?;
    Ok(turns)
}

fn write_replies<W: Write>(output: &mut W, replies: &[String]) -> io::Result<()> {
    for reply in replies {
        writeln!(output, "bot> {reply}")?;
    }
    Ok(())
}
