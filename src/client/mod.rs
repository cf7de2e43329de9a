//! Client management system
//!
//! Per-connection sessions and the shared registry they join.

pub mod handler;
pub mod registry;
pub mod state;

pub use handler::handle_client;
pub use registry::{ClientRegistry, OutputHandle};
pub use state::Client;
