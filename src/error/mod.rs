//! Error handling
//!
//! Defines error types and their mapping onto client-facing replies.

pub mod handlers;
pub mod types;

pub use types::*;
