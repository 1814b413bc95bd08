//! Authentication state
//!
//! `Unauthenticated → Pending → Approved | Rejected`. Approval and rejection end
//! the attempt; callers poll or await the outcome and clear it before retrying.

use log::{debug, info, warn};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Pending,
    Approved,
    Rejected(String),
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthState::Approved | AuthState::Rejected(_))
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Unauthenticated => write!(f, "unauthenticated"),
            AuthState::Pending => write!(f, "pending"),
            AuthState::Approved => write!(f, "approved"),
            AuthState::Rejected(reason) => write!(f, "rejected ({})", reason),
        }
    }
}

#[derive(Debug)]
pub struct AuthTracker {
    state: watch::Sender<AuthState>,
}

impl Default for AuthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        Self { state }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// The request went out; any earlier outcome is forgotten.
    pub fn begin(&self) {
        debug!("Authentication pending");
        self.state.send_replace(AuthState::Pending);
    }

    pub fn approve(&self) {
        info!("Authentication approved");
        self.state.send_replace(AuthState::Approved);
    }

    pub fn reject(&self, reason: &str) {
        warn!("Authentication rejected: {}", reason);
        self.state.send_replace(AuthState::Rejected(reason.to_string()));
    }

    pub fn is_approved(&self) -> bool {
        *self.state.borrow() == AuthState::Approved
    }

    pub fn rejection(&self) -> Option<String> {
        match &*self.state.borrow() {
            AuthState::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Clear an approval so the next attempt starts from scratch.
    pub fn clear_approved(&self) {
        self.state.send_if_modified(|state| {
            if *state == AuthState::Approved {
                *state = AuthState::Unauthenticated;
                true
            } else {
                false
            }
        });
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, AuthState::Rejected(_)) {
                *state = AuthState::Unauthenticated;
                true
            } else {
                false
            }
        });
    }

    pub fn reset(&self) {
        self.state.send_replace(AuthState::Unauthenticated);
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Wait for approval or rejection. A timeout counts as a failed attempt.
    pub async fn wait_for_outcome(&self, timeout: Duration) -> Result<(), AuthError> {
        let mut updates = self.subscribe();
        let outcome = tokio::time::timeout(timeout, async {
            match updates.wait_for(AuthState::is_terminal).await {
                Ok(state) => state.clone(),
                Err(_) => AuthState::Unauthenticated,
            }
        })
        .await;

        match outcome {
            Ok(AuthState::Approved) => Ok(()),
            Ok(AuthState::Rejected(reason)) => Err(AuthError::Rejected(reason)),
            Ok(_) | Err(_) => Err(AuthError::TimedOut(timeout)),
        }
    }
}
