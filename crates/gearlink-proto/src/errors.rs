//! Codec error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire messages.
///
/// None of these are fatal to a session: the offending message is dropped
/// (inbound) or not sent (outbound) and the link stays up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Encoded message exceeds the peer-advertised maximum.
    #[error("payload too large: {size} bytes exceeds peer limit of {max}")]
    PayloadTooLarge {
        /// Encoded size in bytes
        size: usize,
        /// Maximum accepted by the peer
        max: usize,
    },

    /// Direction string does not name a member of its enum.
    #[error("invalid {kind} direction: {value:?}")]
    InvalidDirection {
        /// Which direction enum was being parsed ("rotary" or "swipe")
        kind: &'static str,
        /// The rejected input
        value: String,
    },

    /// Bytes are not a well-formed message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Serialization failed.
    #[error("JSON encode failed: {0}")]
    Encode(String),
}

impl ProtocolError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage(reason.into())
    }
}
