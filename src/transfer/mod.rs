//! File transfer module
//!
//! Sends files as base64 chunks inside chat messages and reassembles the
//! chunks other users send, in whatever order they arrive.

pub mod file_ops;
pub mod incoming;
pub mod manager;
pub mod outgoing;
pub mod results;
pub mod tags;

// Re-export key types and functions
pub use manager::{FINALIZATION_GRACE, FileTransferEngine, IDLE_LIMIT, next_transfer_id};
pub use results::{OutgoingBatch, OutgoingMessage, TransferEvent};
pub use tags::{CHUNK_SIZE, FileTag};
