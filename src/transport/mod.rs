//! Transport layer
//!
//! Byte-level connection to the chat server, plain TCP or TLS.

pub mod connection;
pub mod tls;

pub use connection::{Connection, Endpoint, READ_BUFFER_SIZE};
