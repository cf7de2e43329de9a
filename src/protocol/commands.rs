//! Module `commands`
//!
//! Turns a raw client line into either chat text or a [`Command`].

/// Lines starting with this character are commands, never chat.
pub const COMMAND_PREFIX: char = '\\';

/// A command recognised by the server.
///
/// Matching is exact and case-sensitive. Each uptime/address/count command
/// has a classic literal and a descriptive alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    ServerUptime,  // \serverTime, \server-uptime
    ClientUptime,  // \clientTime, \client-uptime
    ServerAddress, // \serverIP, \server-address
    OnlineCount,   // \clientNumber, \online-count
    Emoji,
    Unknown(String),
}

/// One line received from a chatting client.
#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Chat(&'a str),
    Command(Command),
}

/// Help catalog, one entry per command, in display order.
pub const HELP_CATALOG: &[&str] = &[
    "\\help: List all the commands that can be sent",
    "\\quit: Quit the chat room",
    "\\serverTime (\\server-uptime): Server total runtime",
    "\\clientTime (\\client-uptime): The time you have been in the chat room",
    "\\serverIP (\\server-address): Server IP address",
    "\\clientNumber (\\online-count): Total number of clients currently in the chat room",
    "\\emoji: The emoji you can send",
];

/// Classifies a line (already stripped of its line ending).
pub fn parse_line(line: &str) -> Line<'_> {
    if line.starts_with(COMMAND_PREFIX) {
        Line::Command(parse_command(line))
    } else {
        Line::Chat(line)
    }
}

/// Parses a prefixed command line into the `Command` enum.
pub fn parse_command(raw: &str) -> Command {
    match raw {
        "\\quit" => Command::Quit,
        "\\help" => Command::Help,
        "\\serverTime" | "\\server-uptime" => Command::ServerUptime,
        "\\clientTime" | "\\client-uptime" => Command::ClientUptime,
        "\\serverIP" | "\\server-address" => Command::ServerAddress,
        "\\clientNumber" | "\\online-count" => Command::OnlineCount,
        "\\emoji" => Command::Emoji,
        other => Command::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(parse_command("\\quit"), Command::Quit);
        assert_eq!(parse_command("\\help"), Command::Help);
        assert_eq!(parse_command("\\emoji"), Command::Emoji);
    }

    #[test]
    fn test_parse_classic_and_alias_literals() {
        assert_eq!(parse_command("\\serverTime"), Command::ServerUptime);
        assert_eq!(parse_command("\\server-uptime"), Command::ServerUptime);
        assert_eq!(parse_command("\\clientTime"), Command::ClientUptime);
        assert_eq!(parse_command("\\client-uptime"), Command::ClientUptime);
        assert_eq!(parse_command("\\serverIP"), Command::ServerAddress);
        assert_eq!(parse_command("\\server-address"), Command::ServerAddress);
        assert_eq!(parse_command("\\clientNumber"), Command::OnlineCount);
        assert_eq!(parse_command("\\online-count"), Command::OnlineCount);
    }

    #[test]
    fn test_parse_is_case_sensitive_and_exact() {
        assert_eq!(parse_command("\\QUIT"), Command::Unknown("\\QUIT".into()));
        assert_eq!(parse_command("\\quit "), Command::Unknown("\\quit ".into()));
        assert_eq!(
            parse_command("\\servertime"),
            Command::Unknown("\\servertime".into())
        );
        assert_eq!(parse_command("\\"), Command::Unknown("\\".into()));
    }

    #[test]
    fn test_parse_line_splits_chat_from_commands() {
        assert_eq!(parse_line("hello there"), Line::Chat("hello there"));
        assert_eq!(parse_line(""), Line::Chat(""));
        assert_eq!(parse_line(" \\quit"), Line::Chat(" \\quit"));
        assert_eq!(parse_line("\\quit"), Line::Command(Command::Quit));
        assert_eq!(
            parse_line("\\dance"),
            Line::Command(Command::Unknown("\\dance".into()))
        );
    }

    #[test]
    fn test_every_catalog_entry_names_a_real_command() {
        for entry in HELP_CATALOG {
            let literal = entry.split([':', ' ']).next().unwrap();
            assert!(
                !matches!(parse_command(literal), Command::Unknown(_)),
                "help lists unknown command {literal}"
            );
        }
    }
}
