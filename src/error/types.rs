//! Error types
//!
//! Domain-specific errors for the server, the registry and a single session.

use std::io;

use thiserror::Error;

/// Fatal server errors. These end the process.
#[derive(Debug, Error)]
pub enum ChatServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Reasons a username cannot be registered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("username is empty")]
    EmptyName,

    #[error("username already taken: {0}")]
    NameTaken(String),

    #[error("username is {len} characters, limit is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("chat room is full ({0} users)")]
    Full(usize),
}

/// Errors that end a single session. Never escalated past the session task.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The writer task has gone away, so nothing more can reach the peer.
    #[error("output channel closed")]
    Closed,
}
