//! Client front half
//!
//! Session lifecycle plus the slash-command layer that sits between a
//! terminal and the protocol engine.

pub mod commands;
pub mod input;
pub mod session;

pub use commands::{Flow, execute};
pub use input::{UserCommand, parse_input};
pub use session::Session;
