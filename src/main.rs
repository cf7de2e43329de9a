//! Relay Chat Server - Entry Point
//!
//! A line-based TCP chat room: users pick a unique name, then every line they
//! send is relayed to everyone in the room.

use std::process;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tokio::io::BufReader;

use relay_chat::server::{ConsoleExit, run_console};
use relay_chat::{Server, ServerConfig};

/// Time given to writer tasks to deliver the shutdown notice.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Line-based TCP chat relay server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, with or without the .toml extension
    #[arg(short, long, default_value = "config")]
    config: String,
}

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match ServerConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    info!("Launching relay chat server...");

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Server startup failed: {}", e);
            process::exit(1);
        }
    };

    let registry = server.registry();
    let console_registry = registry.clone();
    println!("Type \\quit to close the chat room server.");

    let shutdown = async move {
        let console = async {
            let stdin = BufReader::new(tokio::io::stdin());
            if run_console(stdin, &console_registry).await == ConsoleExit::InputClosed {
                std::future::pending::<()>().await;
            }
        };

        let interrupt = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received"),
                Err(e) => {
                    error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = console => {}
            _ = interrupt => {}
        }
    };

    let code = match server.run_until(shutdown).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Server stopped: {}", e);
            1
        }
    };

    tokio::time::sleep(SHUTDOWN_GRACE).await;
    info!("The server has shut down ({} users were online)", registry.len().await);

    // Exit explicitly: the stdin reader may still be parked on a blocking read.
    process::exit(code);
}
