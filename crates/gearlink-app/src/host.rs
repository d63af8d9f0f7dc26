//! Host-side input receiver.
//!
//! The host application accepts every message on its logical channel but
//! acts only on INPUT. Anything else is logged and ignored.

use gearlink_core::DEFAULT_CHANNEL_ID;
use gearlink_proto::{InputEvent, ProtocolError, WireMessage, decode};

/// Decodes input events arriving at the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReceiver {
    channel_id: u16,
}

impl Default for InputReceiver {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_ID)
    }
}

impl InputReceiver {
    /// Receiver listening on `channel_id`.
    pub const fn new(channel_id: u16) -> Self {
        Self { channel_id }
    }

    /// Channel id this receiver accepts.
    pub const fn channel_id(&self) -> u16 {
        self.channel_id
    }

    /// Decode one received message.
    ///
    /// Returns `Ok(None)` for other channel ids and non-INPUT messages.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`] from [`decode`]: malformed bytes, or an INPUT
    /// message with an invalid direction.
    pub fn receive(
        &self,
        channel_id: u16,
        data: &[u8],
    ) -> Result<Option<InputEvent>, ProtocolError> {
        if channel_id != self.channel_id {
            tracing::debug!(channel_id, expected = self.channel_id, "ignoring foreign channel");
            return Ok(None);
        }

        match decode(data)? {
            WireMessage::Input(event) => {
                tracing::debug!(kind = event.kind().as_str(), "received input");
                Ok(Some(event))
            },
            other => {
                tracing::info!(kind = other.type_name(), "ignoring non-input message");
                Ok(None)
            },
        }
    }
}
