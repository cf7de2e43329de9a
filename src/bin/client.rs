//! Relay Chat Client
//!
//! Thin terminal client: relays stdin lines to the server and server lines to
//! stdout until the server closes the connection.
//!
//! # Usage
//!
//! ```bash
//! relay-chat-client 127.0.0.1
//! relay-chat-client --port 5000
//! ```

use std::process;

use clap::Parser;
use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::net::TcpStream;

use relay_chat::config::DEFAULT_PORT;
use relay_chat::protocol::responses::ACCEPT;

/// Connect to a relay chat server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server address; prompted for when omitted
    #[arg(value_name = "ADDRESS")]
    address: Option<String>,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

/// How a chat connection ended.
#[derive(Debug, PartialEq, Eq)]
enum Ended {
    /// Server closed before the username was accepted.
    BeforeJoin,
    /// Server closed after joining.
    ServerClosed,
    /// Local input ended.
    InputClosed,
    Failed,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let stream = match connect(&cli, &mut stdin).await {
            Some(stream) => stream,
            None => process::exit(1),
        };

        match chat(stream, &mut stdin).await {
            // Ask for another server, as when the address was unreachable.
            Ended::BeforeJoin if cli.address.is_none() => {
                eprintln!("The server went offline before your username was accepted.");
            }
            Ended::BeforeJoin | Ended::ServerClosed => {
                eprintln!("Disconnected from the server.");
                process::exit(0);
            }
            Ended::InputClosed => process::exit(0),
            Ended::Failed => process::exit(1),
        }
    }
}

/// Relays lines both ways until either side closes.
async fn chat<R>(stream: TcpStream, input: &mut Lines<R>) -> Ended
where
    R: AsyncBufRead + Unpin,
{
    let (read_half, mut write_half) = stream.into_split();
    let mut server_lines = BufReader::new(read_half).lines();
    let mut joined = false;

    loop {
        tokio::select! {
            incoming = server_lines.next_line() => match incoming {
                Ok(Some(line)) => {
                    println!("{}", line);
                    if line.starts_with(ACCEPT) {
                        joined = true;
                        println!("------ Command List: \\help   Quit: \\quit ------");
                    }
                }
                Ok(None) if joined => return Ended::ServerClosed,
                Ok(None) => return Ended::BeforeJoin,
                Err(e) => {
                    eprintln!("Connection error: {}", e);
                    return if joined { Ended::Failed } else { Ended::BeforeJoin };
                }
            },
            outgoing = input.next_line() => match outgoing {
                Ok(Some(mut line)) => {
                    line.push('\n');
                    if let Err(e) = write_half.write_all(line.as_bytes()).await {
                        eprintln!("Failed to send: {}", e);
                        return if joined { Ended::Failed } else { Ended::BeforeJoin };
                    }
                }
                Ok(None) | Err(_) => {
                    debug!("stdin closed, leaving the chat");
                    return Ended::InputClosed;
                }
            },
        }
    }
}

/// Connects to the server, re-prompting for the address on failure when it
/// was typed interactively.
async fn connect(cli: &Cli, stdin: &mut Lines<BufReader<Stdin>>) -> Option<TcpStream> {
    loop {
        let address = match &cli.address {
            Some(address) => address.clone(),
            None => {
                println!("What is the address of the server that you wish to connect to?");
                match stdin.next_line().await {
                    Ok(Some(line)) => line.trim().to_string(),
                    _ => return None,
                }
            }
        };

        match TcpStream::connect((address.as_str(), cli.port)).await {
            Ok(stream) => return Some(stream),
            Err(e) => {
                eprintln!("Could not connect to {}:{}: {}", address, cli.port, e);
                if cli.address.is_some() {
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use tokio::net::TcpListener;

    /// Accepts one connection, writes `lines` and closes it.
    async fn one_shot_server(lines: &'static str) -> TcpStream {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(lines.as_bytes()).await.unwrap();
        });
        TcpStream::connect(addr).await.unwrap()
    }

    #[tokio::test]
    async fn test_close_before_accept_is_reported() {
        let stream = one_shot_server("Please type your username.\n").await;
        let (_typing, keyboard) = duplex(64);

        let ended = chat(stream, &mut BufReader::new(keyboard).lines()).await;
        assert_eq!(ended, Ended::BeforeJoin);
    }

    #[tokio::test]
    async fn test_close_after_accept_is_a_disconnect() {
        let stream = one_shot_server(
            "Please type your username.\nYour username is accepted. Please type messages\n",
        )
        .await;
        let (_typing, keyboard) = duplex(64);

        let ended = chat(stream, &mut BufReader::new(keyboard).lines()).await;
        assert_eq!(ended, Ended::ServerClosed);
    }
}
