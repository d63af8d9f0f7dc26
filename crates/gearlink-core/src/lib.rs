//! GearLink core
//!
//! Session management for the link between a wearable input device and its
//! paired host application. Exactly one peer, exactly one channel.
//!
//! # Architecture
//!
//! The [`Session`] is a Sans-IO, action-based state machine. UI operations
//! ([`Session::connect`], [`Session::disconnect`], ...) and asynchronous
//! transport completions ([`TransportEvent`]) go in; a list of
//! [`SessionAction`]s comes out for the caller to execute against its
//! [`Transport`] and listeners. The state machine never performs I/O, which
//! keeps every transition synchronous, atomic and directly testable.
//!
//! # Components
//!
//! - [`Session`]: connection lifecycle and stale-completion filtering
//! - [`Transport`]: the accessory-link contract consumed by the core
//! - [`TransportEvent`]: completions posted back by a transport
//! - [`SessionError`], [`LinkError`], [`TransportError`]: error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod session;
pub mod transport;

pub use error::{LinkError, SessionError, TransportError};
pub use session::{
    DEFAULT_PROVIDER_APP_NAME, DisconnectMode, Notice, Session, SessionAction, SessionConfig,
    SessionState,
};
pub use transport::{
    Attempt, ChannelHandle, DEFAULT_CHANNEL_ID, DeviceStatus, LossReason, Peer, Transport,
    TransportEvent,
};
