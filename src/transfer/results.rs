//! Transfer result types
//!
//! Values produced under the transfer lock and acted on after it is released.

use std::path::PathBuf;

use crate::error::TransferError;
use crate::protocol::Conversation;

/// A chunk or marker to send as a `!msg` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub transfer_id: u32,
    pub filename: String,
    pub target: Conversation,
    pub payload: String,
}

/// Something the user should hear about
#[derive(Debug)]
pub enum TransferEvent {
    SendStarted {
        target: Conversation,
        filename: String,
    },
    SendProgress {
        id: u32,
        filename: String,
        sent: u64,
        total: u64,
    },
    SendCompleted {
        id: u32,
        target: Conversation,
        filename: String,
    },
    SendFailed {
        target: Conversation,
        error: TransferError,
    },
    ReceiveStarted {
        sender: String,
        filename: String,
        size: Option<u64>,
    },
    ReceiveProgress {
        filename: String,
        received: u64,
        total: u64,
    },
    ReceiveCompleted {
        filename: String,
        path: PathBuf,
    },
    ReceiveFailed {
        filename: String,
        error: TransferError,
    },
}

impl TransferEvent {
    /// Outgoing transfer this event belongs to, once chunks are flowing
    pub fn outgoing_id(&self) -> Option<u32> {
        match self {
            TransferEvent::SendProgress { id, .. } | TransferEvent::SendCompleted { id, .. } => {
                Some(*id)
            }
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferEvent::SendCompleted { .. }
                | TransferEvent::SendFailed { .. }
                | TransferEvent::ReceiveCompleted { .. }
                | TransferEvent::ReceiveFailed { .. }
        )
    }
}

/// Output of one outgoing tick
#[derive(Debug, Default)]
pub struct OutgoingBatch {
    pub messages: Vec<OutgoingMessage>,
    pub events: Vec<TransferEvent>,
}
