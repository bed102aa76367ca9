use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::{
    constants::ASSISTANT_GREETING,
    session::{ConversationController, ConversationMode, MessageRole, Transcript, TranscriptStore},
};

/// Slash commands understood by the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Exit,
    Help,
    Reset,
    ShowHistory,
    SetMode(ConversationMode),
    Unknown(String),
}

impl ChatCommand {
    /// Parse a line beginning with `/`; anything else is a question
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let rest = line.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();

        let command = match (parts.next().unwrap_or(""), parts.next()) {
            ("exit" | "quit", None) => ChatCommand::Exit,
            ("help", None) => ChatCommand::Help,
            ("reset", None) => ChatCommand::Reset,
            ("history", None) => ChatCommand::ShowHistory,
            ("mode", Some("stateless")) => ChatCommand::SetMode(ConversationMode::Stateless),
            ("mode", Some("history")) => ChatCommand::SetMode(ConversationMode::HistoryAware),
            _ => ChatCommand::Unknown(line.to_string()),
        };
        Some(command)
    }
}

const HELP: &str = "Commands: /mode stateless|history, /history, /reset, /help, /exit";

/// Read questions line by line until EOF or `/exit`
///
/// Every question and answer also goes into the returned transcript, which is
/// written to `store` after each turn when one is given.
pub async fn run_chat<R, W>(
    controller: &mut ConversationController,
    store: Option<&TranscriptStore>,
    input: R,
    output: &mut W,
) -> Result<Transcript>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut transcript = Transcript::new();
    let mut lines = input.lines();

    writeln!(output, "{}", ASSISTANT_GREETING.cyan())?;
    writeln!(output, "{}", format!("Mode: {} ({})", controller.mode(), HELP).dimmed())?;

    loop {
        write!(output, "{} ", ">".bold())?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        if let Some(command) = ChatCommand::parse(question) {
            match command {
                ChatCommand::Exit => break,
                ChatCommand::Help => writeln!(output, "{}", HELP)?,
                ChatCommand::Reset => {
                    controller.reset();
                    writeln!(output, "{}", "Chat history cleared.".dimmed())?;
                }
                ChatCommand::ShowHistory => {
                    if controller.history().is_empty() {
                        writeln!(output, "{}", "(history is empty)".dimmed())?;
                    }
                    for message in controller.history().all() {
                        writeln!(output, "[{}] {}", message.role().as_str(), message.content())?;
                    }
                }
                ChatCommand::SetMode(mode) => {
                    controller.set_mode(mode);
                    writeln!(output, "{}", format!("Mode: {}", mode).dimmed())?;
                }
                ChatCommand::Unknown(text) => {
                    writeln!(output, "Unknown command {}. {}", text, HELP)?;
                }
            }
            continue;
        }

        transcript.push(MessageRole::User, question);
        match controller.handle_turn(question).await {
            Ok(answer) => {
                writeln!(output, "{}", answer)?;
                transcript.push(MessageRole::Assistant, answer);
            }
            Err(e) => writeln!(output, "{} {}", "error:".red(), e)?,
        }

        if let Some(store) = store {
            if let Err(e) = store.save(&transcript) {
                warn!("Failed to save transcript: {}", e);
            }
        }
    }

    Ok(transcript)
}
