//! Session handler
//!
//! Drives one connection through name negotiation, the chat loop and
//! teardown. Reads happen on the session task; all writes go through an
//! unbounded queue drained by a dedicated writer task, so direct replies and
//! broadcasts from other sessions never interleave mid-line.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::registry::{ClientRegistry, OutputHandle};
use crate::client::state::Client;
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::error::handlers::{error_to_reply, handle_session_error, is_retryable};
use crate::protocol::responses;
use crate::protocol::{
    CommandContext, CommandStatus, Line, handle_command, parse_line, select_emoji,
};

/// How long teardown waits for queued lines to reach the peer.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on the UTF-8 width of one character.
const MAX_CHAR_BYTES: usize = 4;


/// One line read from the peer.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    /// Line content with its ending removed. Invalid UTF-8 is replaced.
    Line(String),
    /// The line exceeded the read limit and was discarded.
    TooLong,
}

/// Handles one chat connection from accept to close.
///
/// Errors never escape: any I/O fault sends the session down the normal
/// closing path.
pub async fn handle_client(
    stream: TcpStream,
    registry: ClientRegistry,
    config: Arc<ServerConfig>,
) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Dropping connection with unknown peer: {}", e);
            return;
        }
    };
    let mut client = Client::new(peer_addr, stream.local_addr().ok());

    let (read_half, write_half) = stream.into_split();
    let mut reader = LineReader::new(read_half);
    let (out, queue) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(write_half, queue, peer_addr));

    info!("Connection established with {}", peer_addr);
    client.begin_negotiation();

    if let Err(e) = run_session(&mut client, &mut reader, &out, &registry, &config).await {
        handle_session_error(&peer_addr, &e);
    }

    close_session(&mut client, &registry, out, writer).await;
}

async fn run_session(
    client: &mut Client,
    reader: &mut LineReader,
    out: &OutputHandle,
    registry: &ClientRegistry,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let Some(online) = negotiate_username(client, reader, out, registry, config).await? else {
        return Ok(());
    };

    let username = client.username().unwrap_or_default().to_string();
    registry
        .broadcast(&responses::format_join(&username, online))
        .await;

    chat_loop(client, reader, out, registry, config, &username).await
}

/// Prompts until a free name is claimed. `None` means the session ends
/// without ever having joined.
async fn negotiate_username(
    client: &mut Client,
    reader: &mut LineReader,
    out: &OutputHandle,
    registry: &ClientRegistry,
    config: &ServerConfig,
) -> Result<Option<usize>, SessionError> {
    let limit = config.max_username_length.saturating_mul(MAX_CHAR_BYTES);

    loop {
        send(out, responses::WELCOME)?;

        let name = match reader.next_line(limit).await? {
            Some(Inbound::Line(name)) => name,
            Some(Inbound::TooLong) => {
                debug!("Oversized username from {}", client.peer_addr());
                send(out, responses::NAME_TOO_LONG)?;
                continue;
            }
            None => {
                debug!("{} disconnected before choosing a name", client.peer_addr());
                return Ok(None);
            }
        };

        match registry.register(&name, out.clone(), responses::ACCEPT).await {
            Ok(online) => {
                info!("{} joined as {}", client.peer_addr(), name);
                client.accept_username(name, Utc::now().timestamp_millis());
                return Ok(Some(online));
            }
            Err(e) => {
                debug!("Rejected username from {}: {}", client.peer_addr(), e);
                send(out, error_to_reply(&e))?;
                if !is_retryable(&e) {
                    warn!("Turning away {}: {}", client.peer_addr(), e);
                    return Ok(None);
                }
            }
        }
    }
}

async fn chat_loop(
    client: &Client,
    reader: &mut LineReader,
    out: &OutputHandle,
    registry: &ClientRegistry,
    config: &ServerConfig,
    username: &str,
) -> Result<(), SessionError> {
    loop {
        let text = match reader.next_line(config.max_line_length).await? {
            Some(Inbound::Line(text)) => text,
            Some(Inbound::TooLong) => {
                send(out, responses::LINE_TOO_LONG)?;
                continue;
            }
            None => {
                info!("Connection closed by {}", username);
                return Ok(());
            }
        };

        match parse_line(&text) {
            Line::Chat(chat) => {
                let message = responses::format_chat(username, &responses::timestamp(), chat);
                registry.broadcast(&message).await;
            }
            Line::Command(command) => {
                debug!("{} issued {:?}", username, command);

                let ctx = CommandContext {
                    now: Utc::now().timestamp_millis(),
                    server_started_at: registry.started_at(),
                    joined_at: client.joined_at().unwrap_or_else(|| registry.started_at()),
                    online_count: registry.len().await,
                    local_ip: client.local_addr().map(SocketAddr::ip),
                };
                let result = handle_command(&command, &ctx);

                for reply in result.replies {
                    send(out, reply)?;
                }

                match result.status {
                    CommandStatus::Continue => {}
                    CommandStatus::CloseConnection => {
                        info!("{} requested to quit", username);
                        return Ok(());
                    }
                    CommandStatus::SelectEmoji => {
                        let limit = config.max_line_length;
                        if !choose_emoji(reader, out, registry, username, limit).await? {
                            info!("Connection closed by {} during emoji selection", username);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// Reads menu answers until one is valid and broadcasts the emoji.
/// Returns false if the peer closed the connection first.
async fn choose_emoji(
    reader: &mut LineReader,
    out: &OutputHandle,
    registry: &ClientRegistry,
    username: &str,
    limit: usize,
) -> Result<bool, SessionError> {
    loop {
        let answer = match reader.next_line(limit).await? {
            Some(Inbound::Line(answer)) => answer,
            Some(Inbound::TooLong) => {
                send(out, responses::EMOJI_RETRY)?;
                continue;
            }
            None => return Ok(false),
        };

        match select_emoji(&answer) {
            Some(emoji) => {
                registry
                    .broadcast(&responses::format_emoji(username, emoji))
                    .await;
                return Ok(true);
            }
            None => send(out, responses::EMOJI_RETRY)?,
        }
    }
}

/// Removes the registry entry, announces the departure, then lets the writer
/// flush and close the socket.
async fn close_session(
    client: &mut Client,
    registry: &ClientRegistry,
    out: OutputHandle,
    mut writer: JoinHandle<()>,
) {
    if !client.begin_closing() {
        return;
    }

    if let Some(username) = client.username() {
        if registry.unregister(username).await {
            registry.broadcast(&responses::format_leave(username)).await;
        }
    }

    // Last sender owned by this session; the writer exits once the queue drains.
    drop(out);

    match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Writer task for {} failed: {}", client.peer_addr(), e),
        Err(_) => {
            warn!("Timed out flushing output to {}", client.peer_addr());
            writer.abort();
        }
    }

    client.mark_closed();
    info!("Client {} disconnected", client.peer_addr());
}

/// Drains the session's queue into the socket, one line per message.
async fn write_lines(
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<String>,
    peer_addr: SocketAddr,
) {
    while let Some(mut line) = queue.recv().await {
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Write to {} failed: {}", peer_addr, e);
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown of {} failed: {}", peer_addr, e);
    }
}

/// Bounded line reader over the socket's read half.
struct LineReader {
    inner: BufReader<OwnedReadHalf>,
    /// The tail of an oversized line is still pending.
    skipping: bool,
}

impl LineReader {
    fn new(read_half: OwnedReadHalf) -> Self {
        Self {
            inner: BufReader::new(read_half),
            skipping: false,
        }
    }

    /// Reads one line with its `\n` or `\r\n` ending removed. `None` at end
    /// of stream.
    ///
    /// At most `limit` content bytes are buffered. A longer line is reported
    /// as `TooLong` as soon as the limit is crossed; its remainder is dropped
    /// on the next call.
    async fn next_line(&mut self, limit: usize) -> Result<Option<Inbound>, SessionError> {
        if self.skipping {
            self.skip_line().await?;
            self.skipping = false;
        }

        let mut buf = Vec::new();
        // Room for the content plus a `\r\n` ending.
        let cap = limit.saturating_add(2);
        let read = (&mut self.inner)
            .take(cap as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(None);
        }

        if read == cap && !buf.ends_with(b"\n") {
            self.skipping = true;
            return Ok(Some(Inbound::TooLong));
        }

        let text = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let text = text.strip_suffix(b"\r").unwrap_or(text);
        if text.len() > limit {
            return Ok(Some(Inbound::TooLong));
        }

        Ok(Some(Inbound::Line(String::from_utf8_lossy(text).into_owned())))
    }

    /// Consumes input through the next `\n` without buffering it.
    async fn skip_line(&mut self) -> Result<(), SessionError> {
        loop {
            let chunk = self.inner.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(());
            }

            let (used, done) = match chunk.iter().position(|&b| b == b'\n') {
                Some(end) => (end + 1, true),
                None => (chunk.len(), false),
            };
            self.inner.consume(used);
            if done {
                return Ok(());
            }
        }
    }
}

fn send(out: &OutputHandle, line: impl Into<String>) -> Result<(), SessionError> {
    out.send(line.into()).map_err(|_| SessionError::Closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), accepted.unwrap().0)
    }

    fn line(text: &str) -> Option<Inbound> {
        Some(Inbound::Line(text.to_string()))
    }

    async fn reader_for(input: &[u8]) -> LineReader {
        let (mut near, far) = socket_pair().await;
        let (read_half, _write_half) = far.into_split();
        near.write_all(input).await.unwrap();
        near.shutdown().await.unwrap();
        LineReader::new(read_half)
    }

    #[tokio::test]
    async fn test_next_line_strips_line_endings() {
        let mut reader = reader_for(b"unix\nwindows\r\n\nlast").await;

        assert_eq!(reader.next_line(64).await.unwrap(), line("unix"));
        assert_eq!(reader.next_line(64).await.unwrap(), line("windows"));
        assert_eq!(reader.next_line(64).await.unwrap(), line(""));
        assert_eq!(reader.next_line(64).await.unwrap(), line("last"));
        assert_eq!(reader.next_line(64).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let mut reader = reader_for(b"caf\xff\nnext\n").await;

        assert_eq!(reader.next_line(64).await.unwrap(), line("caf\u{FFFD}"));
        assert_eq!(reader.next_line(64).await.unwrap(), line("next"));
    }

    #[tokio::test]
    async fn test_overlong_line_is_skipped() {
        let mut input = vec![b'x'; 10_000];
        input.extend_from_slice(b"\nshort\r\nexact\nsixsix\n");
        let mut reader = reader_for(&input).await;

        assert_eq!(reader.next_line(5).await.unwrap(), Some(Inbound::TooLong));
        assert_eq!(reader.next_line(5).await.unwrap(), line("short"));
        assert_eq!(reader.next_line(5).await.unwrap(), line("exact"));
        assert_eq!(reader.next_line(5).await.unwrap(), Some(Inbound::TooLong));
        assert_eq!(reader.next_line(5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overlong_line_at_end_of_stream() {
        let mut reader = reader_for(&[b'y'; 64]).await;

        assert_eq!(reader.next_line(8).await.unwrap(), Some(Inbound::TooLong));
        assert_eq!(reader.next_line(8).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writer_terminates_lines_and_closes() {
        let (mut near, far) = socket_pair().await;
        let (_read_half, write_half) = far.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = near.local_addr().unwrap();

        let writer = tokio::spawn(write_lines(write_half, rx, peer));
        send(&tx, "first").unwrap();
        send(&tx, String::from("second")).unwrap();
        drop(tx);
        writer.await.unwrap();

        let mut received = String::new();
        near.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_send_fails_once_writer_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        drop(rx);
        assert!(matches!(send(&tx, "lost"), Err(SessionError::Closed)));
    }
}
