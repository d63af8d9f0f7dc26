//! Application layer for GearLink
//!
//! Connects UI gestures to the session and the wire codec, and inbound
//! messages back to the UI.
//!
//! # Components
//!
//! - [`Dispatcher`]: UI contract over one [`gearlink_core::Session`] and one
//!   [`gearlink_core::Transport`]
//! - [`MessageListener`], [`ConnectionListener`], [`NoticeListener`]: UI
//!   callbacks
//! - [`InputReceiver`]: host-side decoder for received input events
//! - [`Runtime`]: async front that serialises commands and transport
//!   completions onto a single task

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod dispatcher;
mod error;
mod host;
mod listener;
mod runtime;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use host::InputReceiver;
pub use listener::{ConnectionListener, MessageListener, NoticeListener};
pub use runtime::{Command, Runtime, RuntimeConfig, RuntimeHandle, TransportEvents};
