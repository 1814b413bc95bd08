//! Error handlers
//!
//! Logging and classification helpers for client errors.

use crate::error::types::ClientError;
use log::{error, warn};

/// Log a client error at a level matching its severity
pub fn handle_error(err: &ClientError) {
    match err {
        ClientError::Transfer(_) => warn!("{}", err),
        _ => error!("{}", err),
    }
}

/// Whether the error ends the current connection attempt
pub fn ends_session(err: &ClientError) -> bool {
    match err {
        ClientError::Auth(_) => true,
        ClientError::Transport(_) => true,
        ClientError::Transfer(_) => false,
        ClientError::Config(_) => true,
        ClientError::Io(_) => false,
    }
}
