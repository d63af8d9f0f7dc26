//! UI callbacks.
//!
//! Each listener trait is implemented for plain closures so a caller can
//! register `|connected| ...` directly.

use gearlink_core::Notice;
use gearlink_proto::WireMessage;

/// Receives inbound messages of a recognised type.
pub trait MessageListener: Send {
    /// Called once per decoded INPUT, CONNECTION_STATUS or ERROR message.
    fn on_message(&mut self, message: WireMessage);
}

impl<F> MessageListener for F
where
    F: FnMut(WireMessage) + Send,
{
    fn on_message(&mut self, message: WireMessage) {
        self(message);
    }
}

/// Receives connection state changes.
pub trait ConnectionListener: Send {
    /// `true` when a channel opens; `false` on failure, loss or disconnect.
    fn on_connection_changed(&mut self, connected: bool);
}

impl<F> ConnectionListener for F
where
    F: FnMut(bool) + Send,
{
    fn on_connection_changed(&mut self, connected: bool) {
        self(connected);
    }
}

/// Receives transient user-visible notices.
pub trait NoticeListener: Send {
    /// Show `notice` to the user.
    fn on_notice(&mut self, notice: &Notice);
}

impl<F> NoticeListener for F
where
    F: FnMut(&Notice) + Send,
{
    fn on_notice(&mut self, notice: &Notice) {
        self(notice);
    }
}
