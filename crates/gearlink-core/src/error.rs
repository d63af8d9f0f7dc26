//! Error types for the GearLink core.
//!
//! Three layers, kept apart so callers can tell them apart:
//! - [`SessionError`]: an operation was rejected by the state machine
//! - [`LinkError`]: the link failed asynchronously (reported, not returned)
//! - [`TransportError`]: a transport primitive failed when invoked
//!
//! None of them is fatal to the process. The user can always retry by
//! connecting again.

use thiserror::Error;

use crate::{session::SessionState, transport::LossReason};

/// Operation rejected by the session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A channel is already open
    #[error("already connected")]
    AlreadyConnected,

    /// Discovery or service connection already in progress
    #[error("connection already in progress")]
    AlreadyConnecting,

    /// Operation not valid in the current state
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the operation was attempted
        state: SessionState,
        /// Operation that was attempted
        operation: &'static str,
    },
}

/// Asynchronous link failure, surfaced to the UI as a disconnect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Discovery reported an error
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Discovery found a peer other than the expected host application
    #[error("discovery error: found unexpected peer {found:?} (expected {expected:?})")]
    UnexpectedPeer {
        /// Configured host application name
        expected: String,
        /// Name the peer advertised
        found: String,
    },

    /// Service connection request failed
    #[error("service connection error: {0}")]
    ServiceConnection(String),

    /// Established channel lost
    #[error("channel lost: {0}")]
    ChannelLost(LossReason),

    /// Transport unusable until reset
    #[error("transport failed: {0}")]
    Transport(String),
}

impl LinkError {
    /// Returns true if connecting again may succeed without a reset.
    ///
    /// Only a failed transport requires an explicit reset first.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}

/// Failure of a transport primitive at the moment it was invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Channel is closed or cannot accept data right now
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// Request could not be issued
    #[error("transport request failed: {0}")]
    Request(String),
}
