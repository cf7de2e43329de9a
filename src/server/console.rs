//! Operator console
//!
//! Reads commands typed on the server's terminal. `\quit` warns every user
//! and asks the server to stop.

use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::client::ClientRegistry;
use crate::protocol::responses::SERVER_SHUTDOWN;

const QUIT_COMMAND: &str = "\\quit";

/// Why the console stopped reading.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator asked for shutdown; users have been told.
    Quit,
    /// Operator input ended; the server keeps running.
    InputClosed,
}

/// Reads operator lines from `input` until `\quit` or end of input.
pub async fn run_console<R>(input: R, registry: &ClientRegistry) -> ConsoleExit
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.strip_suffix('\r').unwrap_or(line.as_str()) {
                QUIT_COMMAND => {
                    info!("Operator requested shutdown");
                    registry.broadcast(SERVER_SHUTDOWN).await;
                    return ConsoleExit::Quit;
                }
                "" => {}
                other => warn!("command input wrong: {}", other),
            },
            Ok(None) => {
                info!("Operator console closed");
                return ConsoleExit::InputClosed;
            }
            Err(e) => {
                warn!("Operator console read failed: {}", e);
                return ConsoleExit::InputClosed;
            }
        }
    }
}
