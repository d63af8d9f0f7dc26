//! Accessory-link transport contract.
//!
//! The core never talks to the link directly. A [`Transport`] implementation
//! exposes the request primitives; everything the link reports back
//! (discovery results, connection results, channel loss, inbound data)
//! arrives later as a [`TransportEvent`] that the owner feeds to the
//! [`crate::Session`]. Completions may arrive in any order relative to the
//! requests that caused them.

use std::fmt;

use crate::error::TransportError;

/// Logical channel id multiplexing every message type on the link.
pub const DEFAULT_CHANNEL_ID: u16 = 104;

/// Identity of an open channel, issued by the transport.
///
/// Compared by value to recognise completions for a channel that has since
/// been closed or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(u64);

impl ChannelHandle {
    /// Wrap a transport-assigned channel id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Transport-assigned id.
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

/// Identifier of one `connect()` attempt.
///
/// Discovery and service-connection completions echo the attempt that
/// requested them. Anything tagged with an older attempt is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Attempt(u64);

impl Attempt {
    /// Wrap a raw attempt number.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw attempt number.
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt#{}", self.0)
    }
}

/// Remote endpoint found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Application name the peer advertises
    pub app_name: String,
    /// Largest message, in bytes, the peer accepts
    pub max_data_size: usize,
}

impl Peer {
    /// Create a peer description.
    pub fn new(app_name: impl Into<String>, max_data_size: usize) -> Self {
        Self { app_name: app_name.into(), max_data_size }
    }
}

/// Why an established channel went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LossReason {
    /// Host application closed its end
    PeerDisconnected,
    /// Wearable detached from the host device
    DeviceDetached,
    /// Unrecoverable link error
    Fatal,
    /// Any other transport-specific reason
    Other(String),
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerDisconnected => f.write_str("peer disconnected"),
            Self::DeviceDetached => f.write_str("device detached"),
            Self::Fatal => f.write_str("fatal link error"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Attachment state of the wearable to its host device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Attached to host
    Attached,
    /// Detached from host
    Detached,
}

/// Completions and notifications posted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Discovery found a peer
    PeerFound {
        /// Attempt that started discovery
        attempt: Attempt,
        /// The peer
        peer: Peer,
    },

    /// Discovery failed
    DiscoveryFailed {
        /// Attempt that started discovery
        attempt: Attempt,
        /// Transport-specific description
        reason: String,
    },

    /// Service connection established
    ServiceConnected {
        /// Attempt that requested the connection
        attempt: Attempt,
        /// The new channel
        channel: ChannelHandle,
    },

    /// Service connection request failed
    ServiceConnectionFailed {
        /// Attempt that requested the connection
        attempt: Attempt,
        /// Transport-specific description
        reason: String,
    },

    /// An established channel was lost
    ChannelLost {
        /// Channel that was lost
        channel: ChannelHandle,
        /// Why
        reason: LossReason,
    },

    /// Bytes arrived on a channel
    DataReceived {
        /// Channel the data arrived on
        channel: ChannelHandle,
        /// Logical channel id the peer sent on
        channel_id: u16,
        /// Raw message bytes
        data: Vec<u8>,
    },

    /// Wearable attached to or detached from its host
    DeviceStatusChanged(DeviceStatus),

    /// The transport itself is unusable
    TransportFailed {
        /// Transport-specific description
        reason: String,
    },
}

/// Request side of the accessory link.
///
/// Each request returns as soon as it has been issued; its outcome is
/// reported later as a [`TransportEvent`]. An `Err` from `discover_peers` or
/// `request_connection` means the request could not even be issued, and is
/// treated like the corresponding failure completion.
///
/// # Invariants
///
/// - `send` never blocks waiting for the channel; it fails instead.
/// - `close` on a channel that is already closed or unknown is a no-op.
pub trait Transport {
    /// Start discovering peers for `attempt`.
    fn discover_peers(&mut self, attempt: Attempt) -> Result<(), TransportError>;

    /// Request a service connection to `peer` for `attempt`.
    fn request_connection(&mut self, attempt: Attempt, peer: &Peer)
    -> Result<(), TransportError>;

    /// Send one message on `channel` under logical `channel_id`.
    fn send(
        &mut self,
        channel: ChannelHandle,
        channel_id: u16,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Close `channel`.
    fn close(&mut self, channel: ChannelHandle) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn discover_peers(&mut self, attempt: Attempt) -> Result<(), TransportError> {
        (**self).discover_peers(attempt)
    }

    fn request_connection(
        &mut self,
        attempt: Attempt,
        peer: &Peer,
    ) -> Result<(), TransportError> {
        (**self).request_connection(attempt, peer)
    }

    fn send(
        &mut self,
        channel: ChannelHandle,
        channel_id: u16,
        data: &[u8],
    ) -> Result<(), TransportError> {
        (**self).send(channel, channel_id, data)
    }

    fn close(&mut self, channel: ChannelHandle) -> Result<(), TransportError> {
        (**self).close(channel)
    }
}
