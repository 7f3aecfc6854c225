//! Console entry point.
//!
//! Runs the full bot against a line-based console transport: every stdin
//! line is one inbound message, replies and reminders are printed back.
//! Prefix a line with `@name ` to talk as a different user; everything
//! else arrives as the default `console` user.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dotenvy::dotenv;
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

use eventbell::core::Config;
use eventbell::database::Database;
use eventbell::dialogue::{BotContext, DialogueHandler};
use eventbell::scheduler::ReminderScheduler;
use eventbell::transport::{ChatId, ChatPort, Incoming, Outgoing};

/// Prints outbound messages to stdout, keyboard rows as bracketed hints.
struct ConsolePort;

#[async_trait]
impl ChatPort for ConsolePort {
    async fn send(&self, message: Outgoing) -> Result<()> {
        println!("\n🤖 {}", message.text);
        if let Some(keyboard) = message.keyboard {
            for row in keyboard.layout() {
                println!("   [{}]", row.join(" | "));
            }
        }
        Ok(())
    }
}

/// Splits an optional `@name ` sender prefix off a console line.
fn split_sender(line: &str) -> (String, String) {
    if let Some(rest) = line.strip_prefix('@') {
        if let Some((name, text)) = rest.split_once(char::is_whitespace) {
            if !name.is_empty() && !text.trim().is_empty() {
                return (name.to_string(), text.trim().to_string());
            }
        }
    }
    ("console".to_string(), line.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting EventBell...");

    let database = Database::new(&config.database_path).await?;
    let port: Arc<dyn ChatPort> = Arc::new(ConsolePort);

    // Re-arm persisted reminders before accepting input, so a restart
    // never silently drops a timer.
    let scheduler =
        ReminderScheduler::new(database.clone(), port.clone(), config.service_utc_offset);
    scheduler.rearm_all().await?;

    let dialogue = DialogueHandler::new(BotContext::new(database, port, scheduler, config));

    info!("💬 Console transport ready. Type a message, prefix '@name ' to talk as another user, Ctrl-D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let (user_ref, text) = split_sender(&line);
        let incoming = Incoming {
            user_ref,
            chat: ChatId(0),
            text,
        };

        let handler = dialogue.clone();
        tokio::spawn(async move {
            if let Err(e) = handler.handle_message(incoming).await {
                error!("Error handling message: {e}");
            }
        });
    }

    info!("Console closed, shutting down.");
    Ok(())
}
