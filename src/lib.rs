//! Relay chat: a line-based TCP chat room server.
//!
//! Sessions negotiate a unique username against the shared
//! [`client::ClientRegistry`], then every line they send is either answered
//! as a command or broadcast to the whole room.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use crate::config::ServerConfig;
pub use crate::server::Server;
