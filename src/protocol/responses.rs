//! Wire strings
//!
//! Every line the server sends. The welcome and acceptance strings are matched
//! by clients and must not change.

use chrono::Local;

pub const WELCOME: &str = "Please type your username.";
pub const ACCEPT: &str = "Your username is accepted. Please type messages";

pub const NAME_EMPTY: &str = "Sorry, you can not set the name as empty";
pub const NAME_TAKEN: &str = "Sorry, this username is unavailable";
pub const NAME_TOO_LONG: &str = "Sorry, this username is too long";
pub const ROOM_FULL: &str = "Sorry, the chat room is full";
pub const LINE_TOO_LONG: &str = "Sorry, your message is too long";

pub const INVALID_COMMAND: &str = "Invalid command";
pub const HELP_FOOTER: &str = "------ case sensitive ------";

pub const EMOJI_PROMPT: &str = "Please select the emoji you want to send: (enter the number)";
pub const EMOJI_RETRY: &str = "Invalid emoji, select again:";

pub const SERVER_SHUTDOWN: &str = "The server is shut down.";

/// Local wall-clock time as `HH:MM:SS`.
pub fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

pub fn format_join(username: &str, online: usize) -> String {
    format!("{} has entered the chat (online: {})", username, online)
}

pub fn format_leave(username: &str) -> String {
    format!("{} has left the chat.", username)
}

pub fn format_chat(username: &str, time: &str, text: &str) -> String {
    format!("{}({}): {}", username, time, text)
}

pub fn format_emoji(username: &str, emoji: &str) -> String {
    format!("{}: {}", username, emoji)
}
