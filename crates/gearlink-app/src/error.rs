//! Dispatcher errors.

use gearlink_core::{SessionError, TransportError};
use gearlink_proto::ProtocolError;
use thiserror::Error;

/// Error returned by a [`crate::Dispatcher`] operation.
///
/// None of these change session state except as documented on the
/// operation that returned them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// `init` has not been called, or the dispatcher was destroyed
    #[error("dispatcher not initialized")]
    NotInitialized,

    /// No channel is open; the event was dropped
    #[error("not connected")]
    NotConnected,

    /// Session rejected the operation
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Message could not be built or encoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Transport refused the send
    #[error("send failed: {0}")]
    SendFailed(#[from] TransportError),

    /// Runtime task has stopped
    #[error("runtime stopped")]
    RuntimeStopped,
}
