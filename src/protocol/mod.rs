//! Chat protocol implementation
//!
//! Handles framing, payload escaping, command parsing and request building for
//! the colon-delimited, `!`-prefixed line protocol.

pub mod auth;
pub mod commands;
pub mod engine;
pub mod escape;
pub mod frame;
pub mod motd;
pub mod requests;

/// First byte of every protocol record
pub const COMMAND_MARKER: u8 = b'!';

pub use auth::{AuthState, AuthTracker};
pub use commands::{Approval, Conversation, RemovalKind, ServerCommand, parse_record};
pub use engine::{ProtocolEngine, SessionSnapshot};
pub use escape::{escape_for_wire, unescape_from_wire};
pub use frame::FrameDecoder;
pub use motd::MotdBuffer;
pub use requests::ClientRequest;
