//! Dispatcher error types

use std::fmt;

use contracts::{ListenerError, Priority};
use thiserror::Error;

use crate::connection::ConnectionId;

/// Identifies the listener behind a failure
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerLabel {
    pub id: ConnectionId,
    pub name: Option<String>,
    pub priority: Priority,
}

impl fmt::Display for ListenerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "'{}' ({}, priority {})", name, self.id, self.priority),
            None => write!(f, "{} (priority {})", self.id, self.priority),
        }
    }
}

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Fire called while another fire is in progress
    #[error("dispatcher '{dispatcher}' is already firing")]
    AlreadyFiring { dispatcher: String },

    /// Connect called while a fire is in progress
    #[error("cannot connect to dispatcher '{dispatcher}' while it is firing")]
    ConnectWhileFiring { dispatcher: String },

    /// Cancel called from the dispatcher's own running listener
    #[error(
        "cannot cancel dispatcher '{dispatcher}' from its own running listener; cancel the event instead"
    )]
    CancelFromListener { dispatcher: String },

    /// Priority cannot be ordered
    #[error("invalid listener priority: {priority}")]
    InvalidPriority { priority: f64 },

    /// Dispatcher has been destroyed
    #[error("dispatcher '{dispatcher}' has been destroyed")]
    Destroyed { dispatcher: String },

    /// Listener returned an error
    #[error("listener {listener} of dispatcher '{dispatcher}' failed: {source}")]
    ListenerFailed {
        dispatcher: String,
        listener: ListenerLabel,
        #[source]
        source: ListenerError,
    },

    /// Listener task panicked
    #[error("listener {listener} of dispatcher '{dispatcher}' panicked: {message}")]
    ListenerPanicked {
        dispatcher: String,
        listener: ListenerLabel,
        message: String,
    },
}

impl DispatcherError {
    /// Programmer mistakes, surfaced synchronously
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyFiring { .. }
                | Self::ConnectWhileFiring { .. }
                | Self::CancelFromListener { .. }
                | Self::InvalidPriority { .. }
                | Self::Destroyed { .. }
        )
    }

    /// The failing listener, for listener failures
    pub fn listener(&self) -> Option<&ListenerLabel> {
        match self {
            Self::ListenerFailed { listener, .. } | Self::ListenerPanicked { listener, .. } => {
                Some(listener)
            }
            _ => None,
        }
    }
}
