//! Error types
//!
//! Defines domain-specific error types for each layer of the chat client.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Transport layer errors
#[derive(Debug)]
pub enum TransportError {
    NotConnected,
    ConnectTimeout(String),
    ConnectFailed(String, io::Error),
    InvalidServerName(String),
    TlsHandshake(String, io::Error),
    Closed,
    Io(io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "Not connected"),
            TransportError::ConnectTimeout(addr) => write!(f, "Timed out connecting to {}", addr),
            TransportError::ConnectFailed(addr, e) => {
                write!(f, "Failed to connect to {}: {}", addr, e)
            }
            TransportError::InvalidServerName(host) => {
                write!(f, "Invalid server name for TLS: {}", host)
            }
            TransportError::TlsHandshake(host, e) => {
                write!(f, "TLS handshake with {} failed: {}", host, e)
            }
            TransportError::Closed => write!(f, "Connection closed"),
            TransportError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Io(error)
    }
}

/// Authentication errors for a single connection attempt
#[derive(Debug)]
pub enum AuthError {
    Rejected(String),
    TimedOut(Duration),
    RequestFailed(TransportError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Rejected(reason) => write!(f, "Authentication rejected: {}", reason),
            AuthError::TimedOut(after) => {
                write!(f, "No authentication response after {}s", after.as_secs())
            }
            AuthError::RequestFailed(e) => write!(f, "Failed to send authentication: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

/// File transfer errors
#[derive(Debug)]
pub enum TransferError {
    SourceUnreadable(PathBuf, io::Error),
    NotAFile(PathBuf),
    TempFile(PathBuf, io::Error),
    Write(PathBuf, io::Error),
    Save(PathBuf, io::Error),
    Incomplete {
        filename: String,
        received: u32,
        total: u32,
    },
    /// No chunk arrived for too long and no end marker was seen
    Stalled {
        filename: String,
        received: u32,
    },
    NotSent {
        filename: String,
        source: TransportError,
    },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::SourceUnreadable(p, e) => {
                write!(f, "Cannot read {}: {}", p.display(), e)
            }
            TransferError::NotAFile(p) => write!(f, "Not a regular file: {}", p.display()),
            TransferError::TempFile(p, e) => {
                write!(f, "Cannot create {}: {}", p.display(), e)
            }
            TransferError::Write(p, e) => write!(f, "Failed writing {}: {}", p.display(), e),
            TransferError::Save(p, e) => write!(f, "Failed to save file {}: {}", p.display(), e),
            TransferError::Incomplete {
                filename,
                received,
                total,
            } => write!(
                f,
                "File transfer incomplete: {} (received {} of {} chunks)",
                filename, received, total
            ),
            TransferError::Stalled { filename, received } => write!(
                f,
                "File transfer stalled: {} ({} chunks received, no end marker)",
                filename, received
            ),
            TransferError::NotSent { filename, source } => {
                write!(f, "Could not send {}: {}", filename, source)
            }
        }
    }
}

impl std::error::Error for TransferError {}

/// General client error that encompasses all error types
#[derive(Debug)]
pub enum ClientError {
    Transport(TransportError),
    Auth(AuthError),
    Transfer(TransferError),
    Config(config::ConfigError),
    Io(io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "Transport error: {}", e),
            ClientError::Auth(e) => write!(f, "Authentication error: {}", e),
            ClientError::Transfer(e) => write!(f, "Transfer error: {}", e),
            ClientError::Config(e) => write!(f, "Configuration error: {}", e),
            ClientError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<TransportError> for ClientError {
    fn from(error: TransportError) -> Self {
        ClientError::Transport(error)
    }
}

impl From<AuthError> for ClientError {
    fn from(error: AuthError) -> Self {
        ClientError::Auth(error)
    }
}

impl From<TransferError> for ClientError {
    fn from(error: TransferError) -> Self {
        ClientError::Transfer(error)
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(error: config::ConfigError) -> Self {
        ClientError::Config(error)
    }
}

impl From<io::Error> for ClientError {
    fn from(error: io::Error) -> Self {
        ClientError::Io(error)
    }
}
