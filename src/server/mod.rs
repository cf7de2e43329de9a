//! Server core functionality
//!
//! The listener loop that spawns sessions, and the operator console that can
//! stop it.

pub mod console;
pub mod core;

pub use self::console::{ConsoleExit, run_console};
pub use self::core::Server;
