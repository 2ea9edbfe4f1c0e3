mod command;
mod helper;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;

use salesdesk_application::{ChatSession, TurnReply};
use salesdesk_core::conversation::Message;
use salesdesk_core::session::SessionIdentityManager;
use salesdesk_infrastructure::{ConfigService, SalesdeskPaths, TomlLocalStorage};
use salesdesk_interaction::HttpChatBackend;

use command::Command;
use helper::CliHelper;

/// Terminal client for the sales-data assistant.
///
/// 1. Loads `config.toml` and installs file logging
/// 2. Restores (or creates) the anonymous session and its history
/// 3. Reads lines: commands are handled locally, anything else is sent
#[tokio::main]
async fn main() -> Result<()> {
    let paths = SalesdeskPaths::default();
    let _log_guard = logging::init(&paths)?;

    let config = ConfigService::new(&paths)?
        .load()
        .context("Failed to load configuration")?;
    let storage = Arc::new(TomlLocalStorage::new(paths.local_storage_file()?));
    let identity = SessionIdentityManager::new(storage);
    let backend = Arc::new(HttpChatBackend::from_config(&config)?);

    let session = ChatSession::bootstrap(&identity, backend, &config)
        .await
        .context("Failed to start chat session")?;
    tracing::info!(session_id = %session.session_id(), "REPL started");

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new(session.companies())));

    println!("{}", "=== SalesDesk ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Connected to {} | company: {}",
            config.base_url,
            session.company()
        )
        .bright_black()
    );
    println!(
        "{}",
        "Ask about sales data, '/company <name>' to switch, '/history', or 'quit' to exit."
            .bright_black()
    );
    println!();
    print_history(&session);

    // ===== Main REPL Loop =====
    loop {
        let prompt = format!("[{}] >> ", session.company());
        match rl.readline(&prompt) {
            Ok(line) => {
                let command = Command::parse(&line);
                if !matches!(command, Command::Empty) {
                    let _ = rl.add_history_entry(line.as_str());
                }
                if !handle(&session, command).await {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    Ok(())
}

/// Runs one command. Returns `false` when the REPL should stop.
async fn handle(session: &ChatSession, command: Command) -> bool {
    match command {
        Command::Quit => return false,
        Command::Empty => {}
        Command::Message(text) => {
            println!("{}", "Thinking...".bright_black());
            match session.send(&text).await {
                Ok(outcome) => {
                    let message = match &outcome.reply {
                        TurnReply::Answered(reply) => Message::assistant(reply.response.as_str()),
                        TurnReply::Failed(err) => Message::error_notice(err),
                    };
                    print_message(session, &message);
                }
                Err(rejected) => println!("{}", rejected.to_string().yellow()),
            }
        }
        Command::SelectCompany(name) => match session.select_company(&name) {
            Ok(()) => println!("{}", format!("Company set to {name}").green()),
            Err(err) => {
                println!("{}", err.to_string().red());
                print_companies(session);
            }
        },
        Command::ListCompanies => print_companies(session),
        Command::History => print_history(session),
        Command::Refresh => {
            if session.refresh().await {
                print_history(session);
            } else {
                println!("{}", "Could not reach the server; showing the last known conversation.".yellow());
            }
        }
        Command::ShowSession => println!("{}", session.session_id().as_str().bright_black()),
        Command::Unknown(name) => {
            println!("{}", format!("Unknown command {name}").bright_black());
        }
    }
    true
}

fn print_history(session: &ChatSession) {
    let snapshot = session.snapshot();
    if snapshot.is_empty() {
        println!("{}", "No previous conversation.".bright_black());
        return;
    }
    for message in snapshot.messages() {
        print_message(session, message);
    }
}

fn print_message(session: &ChatSession, message: &Message) {
    let text = session.render(message).plain_text();
    if message.is_user() {
        for line in text.lines() {
            println!("{}", format!("> {line}").green());
        }
    } else {
        for line in text.lines() {
            println!("{}", line.bright_blue());
        }
        println!();
    }
}

fn print_companies(session: &ChatSession) {
    let current = session.company();
    for company in session.companies() {
        if *company == current {
            println!("{}", format!("* {company}").green());
        } else {
            println!("  {company}");
        }
    }
}
