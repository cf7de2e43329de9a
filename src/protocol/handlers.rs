//! Command handlers for the relay chat server.
//!
//! Dispatch is a pure function of the parsed [`Command`] and a snapshot of
//! session context. It never touches the registry; the caller gathers the
//! online count beforehand and performs any broadcast afterwards.

use std::net::IpAddr;

use crate::protocol::commands::{Command, HELP_CATALOG};
use crate::protocol::responses;

/// Emoji menu: label shown to the user, text broadcast on selection.
pub const EMOJI_CATALOG: &[(&str, &str)] = &[
    ("Greet", "~^o^~"),
    ("Bored", "\\(╯-╰)/"),
    ("Sad", "//(ㄒoㄒ)//"),
    ("Bye", "(^_^)/~~"),
];

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Read-only view of the invoking session, captured just before dispatch.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Current time, epoch millis
    pub now: i64,
    pub server_started_at: i64,
    pub joined_at: i64,
    pub online_count: usize,
    /// Server address as seen on this session's socket
    pub local_ip: Option<IpAddr>,
}

/// What the session does after sending the reply lines.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Continue,
    /// Run the emoji selection loop on the same connection.
    SelectEmoji,
    CloseConnection,
}

/// Reply lines for the invoking session only, plus the follow-up action.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub replies: Vec<String>,
}

impl CommandResult {
    fn reply(line: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Continue,
            replies: vec![line.into()],
        }
    }
}

/// Dispatches a parsed command to its handler.
pub fn handle_command(command: &Command, ctx: &CommandContext) -> CommandResult {
    match command {
        Command::Quit => CommandResult {
            status: CommandStatus::CloseConnection,
            replies: Vec::new(),
        },
        Command::Help => handle_cmd_help(),
        Command::ServerUptime => CommandResult::reply(format!(
            "server has run for {} minutes",
            elapsed_minutes(ctx.server_started_at, ctx.now)
        )),
        Command::ClientUptime => CommandResult::reply(format!(
            "you have been in the chat room for {} minutes",
            elapsed_minutes(ctx.joined_at, ctx.now)
        )),
        Command::ServerAddress => handle_cmd_server_address(ctx.local_ip),
        Command::OnlineCount => {
            CommandResult::reply(format!("client numbers: {}", ctx.online_count))
        }
        Command::Emoji => CommandResult {
            status: CommandStatus::SelectEmoji,
            replies: emoji_menu(),
        },
        Command::Unknown(_) => CommandResult::reply(responses::INVALID_COMMAND),
    }
}

fn handle_cmd_help() -> CommandResult {
    let mut replies: Vec<String> = HELP_CATALOG
        .iter()
        .map(|entry| format!("Command {}", entry))
        .collect();
    replies.push(responses::HELP_FOOTER.to_string());

    CommandResult {
        status: CommandStatus::Continue,
        replies,
    }
}

fn handle_cmd_server_address(local_ip: Option<IpAddr>) -> CommandResult {
    match local_ip {
        Some(ip) => CommandResult::reply(format!("server IP: {}", ip)),
        None => CommandResult::reply("server IP: unknown"),
    }
}

/// Whole minutes between two epoch-millis instants, floored. Clock skew
/// backwards reads as zero.
fn elapsed_minutes(since: i64, now: i64) -> i64 {
    (now - since).max(0) / MILLIS_PER_MINUTE
}

/// Menu sent when the emoji command is issued.
pub fn emoji_menu() -> Vec<String> {
    let mut lines = Vec::with_capacity(EMOJI_CATALOG.len() + 1);
    lines.push(responses::EMOJI_PROMPT.to_string());
    lines.extend(
        EMOJI_CATALOG
            .iter()
            .enumerate()
            .map(|(i, (label, _))| format!("{}. {}", i + 1, label)),
    );
    lines
}

/// Resolves a menu answer to its emoji. Only the bare index `1..=N` matches.
pub fn select_emoji(answer: &str) -> Option<&'static str> {
    EMOJI_CATALOG
        .iter()
        .enumerate()
        .find(|(i, _)| answer == (i + 1).to_string())
        .map(|(_, (_, emoji))| *emoji)
}
