//! Interactive terminal front-end for the deskpilot agent.
//!
//! Reads lines from stdin, streams assistant output as it arrives, and keeps
//! one conversation going until `/new`. Slash commands: `/new`, `/list`,
//! `/delete <id>`, `/exit`.

use std::io::Write;

use anyhow::Context;
use deskpilot::{Agent, AgentConfig, AgentEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AgentConfig::default();
    anyhow::ensure!(
        !config.api_key.is_empty(),
        "OPENROUTER_API_KEY is not set"
    );
    let agent = Agent::new(config).context("building agent")?;

    let mut events = agent.subscribe().await;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                AgentEvent::TextDelta(delta) => {
                    print!("{delta}");
                    let _ = std::io::stdout().flush();
                }
                AgentEvent::ToolCallStart { tool_name, .. } => {
                    println!("\n[tool] {tool_name} ...");
                }
                AgentEvent::ToolCallComplete { tool_name } => {
                    println!("[tool] {tool_name} done");
                }
                AgentEvent::Complete { .. } => println!(),
                AgentEvent::Error(message) => eprintln!("\nerror: {message}"),
            }
        }
    });

    println!("deskpilot ready. /new starts a fresh conversation, /exit quits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current_conversation: Option<String> = None;

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/exit" | "/quit" => break,
            "/new" => {
                current_conversation = None;
                println!("started a new conversation");
            }
            "/list" => match agent.list_conversations().await {
                Ok(summaries) if summaries.is_empty() => println!("no conversations yet"),
                Ok(summaries) => {
                    for summary in summaries {
                        println!(
                            "{}  {}  ({} messages, updated {})",
                            summary.id, summary.title, summary.message_count, summary.updated
                        );
                    }
                }
                Err(err) => eprintln!("error: {err}"),
            },
            _ if input.starts_with("/delete ") => {
                let id = input.trim_start_matches("/delete ").trim();
                match agent.delete_conversation(id).await {
                    Ok(()) => {
                        if current_conversation.as_deref() == Some(id) {
                            current_conversation = None;
                        }
                        println!("deleted {id}");
                    }
                    Err(err) => eprintln!("error: {err}"),
                }
            }
            _ => match agent.chat(input, current_conversation.as_deref()).await {
                Ok(outcome) => current_conversation = Some(outcome.conversation_id),
                Err(err) => eprintln!("error: {err}"),
            },
        }
    }

    drop(agent);
    printer.abort();
    Ok(())
}
