//! Terminal chat front end
//!
//! Streams the in-flight reply to stdout as it grows and lets Ctrl-C cancel
//! the active turn.

use anyhow::{bail, Result};
use finchat_core::{
    welcome_message, ChatBackend, ChatRole, ChatSession, ClientConfig, RejectReason, TurnOutcome,
    FALLBACK_REPLY,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const HELP: &str = "Commands:\n  /stock NAME   select the stock for following questions\n  /history      print the conversation\n  /help         show this help\n  /quit         leave the chat";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Ask(&'a str),
    SelectStock(&'a str),
    History,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_input(input: &str) -> ReplCommand<'_> {
    let trimmed = input.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplCommand::Ask(input);
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "stock" => ReplCommand::SelectStock(arg),
        "history" => ReplCommand::History,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(name),
    }
}

/// Run one turn, echoing reply text to `out` as it streams in.
///
/// A failed write ends the turn early; dropping the turn returns the session
/// to idle.
pub async fn run_turn<B: ChatBackend, W: Write>(
    session: &ChatSession<B>,
    text: &str,
    subject: &str,
    out: &mut W,
) -> Result<TurnOutcome> {
    let mut view = session.subscribe();
    let mut printed = 0usize;

    let turn = session.submit_turn(text, subject);
    tokio::pin!(turn);

    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            changed = view.changed() => {
                if changed.is_err() {
                    continue;
                }
                let view = view.borrow_and_update();
                if view.in_flight.len() > printed {
                    write!(out, "{}", &view.in_flight[printed..])?;
                    out.flush()?;
                    printed = view.in_flight.len();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if session.cancel_turn() {
                    debug!("Cancelling active turn on Ctrl-C");
                }
            }
        }
    };

    match &outcome {
        TurnOutcome::Completed(reply) => {
            if reply.content.len() > printed {
                write!(out, "{}", &reply.content[printed..])?;
            }
            writeln!(out)?;
        }
        TurnOutcome::Failed(e) => {
            warn!("Chat turn failed: {}", e);
            if printed > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{}", FALLBACK_REPLY)?;
        }
        TurnOutcome::Cancelled => writeln!(out, "\n[cancelled]")?,
        TurnOutcome::Rejected(RejectReason::EmptyMessage) => {}
        TurnOutcome::Rejected(reason) => writeln!(out, "[not sent: {:?}]", reason)?,
    }
    out.flush()?;
    Ok(outcome)
}

pub async fn run_repl<B: ChatBackend>(
    backend: B,
    config: &ClientConfig,
    stock: Option<String>,
) -> Result<()> {
    let mut subject = stock.unwrap_or_default();
    let session =
        ChatSession::new(backend, config).with_greeting(welcome_message(Some(subject.as_str())));
    debug!("Chat session using model {}", session.chat_model());
    let mut stdout = std::io::stdout();

    for message in session.history() {
        writeln!(stdout, "{}\n", message.content)?;
    }
    writeln!(stdout, "{}\n", HELP)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "{}> ", if subject.is_empty() { "finchat" } else { subject.as_str() })?;
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            writeln!(stdout)?;
            break;
        };
        match parse_input(&line) {
            ReplCommand::Ask(text) => {
                run_turn(&session, text, &subject, &mut stdout).await?;
            }
            ReplCommand::SelectStock("") => writeln!(stdout, "Usage: /stock NAME")?,
            ReplCommand::SelectStock(name) => {
                subject = name.to_string();
                writeln!(stdout, "Selected stock: {}", subject)?;
            }
            ReplCommand::History => {
                for message in session.history() {
                    let speaker = match message.role {
                        ChatRole::User => "you",
                        ChatRole::Assistant => "assistant",
                    };
                    writeln!(stdout, "[{}] {}\n", speaker, message.content)?;
                }
            }
            ReplCommand::Help => writeln!(stdout, "{}", HELP)?,
            ReplCommand::Quit => break,
            ReplCommand::Unknown(name) => {
                writeln!(stdout, "Unknown command /{}; try /help", name)?
            }
        }
    }

    session.shutdown();
    Ok(())
}

pub async fn ask_once<B: ChatBackend>(
    backend: B,
    config: &ClientConfig,
    message: &str,
    stock: &str,
) -> Result<()> {
    let session = ChatSession::new(backend, config);
    match run_turn(&session, message, stock, &mut std::io::stdout()).await? {
        TurnOutcome::Completed(_) => Ok(()),
        TurnOutcome::Failed(e) => bail!("chat turn failed: {}", e),
        TurnOutcome::Cancelled => bail!("chat turn cancelled"),
        TurnOutcome::Rejected(reason) => bail!("message not sent: {:?}", reason),
    }
}
