//! radi8c - terminal chat client core
//!
//! Transport, protocol engine and file transfer for the radi8 line protocol.

pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod protocol;
pub mod transfer;
pub mod transport;
pub mod utils;

pub use client::Session;
pub use config::ClientConfig;
pub use protocol::ProtocolEngine;
