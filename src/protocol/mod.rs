//! Chat line protocol
//!
//! Line parsing, command dispatch and the exact strings sent over the wire.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{COMMAND_PREFIX, Command, Line, parse_line};
pub use handlers::{CommandContext, CommandResult, CommandStatus, handle_command, select_emoji};
