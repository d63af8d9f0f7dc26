//! GearLink wire protocol.
//!
//! Messages exchanged between the wearable endpoint and its paired host are
//! single UTF-8 JSON objects, one per transport send, with no length prefix:
//!
//! ```text
//! {"type":"INPUT","event":"CLICK","x":120,"y":64}
//! {"type":"INPUT","event":"ROTARY","direction":"CW"}
//! {"type":"CONNECTION_STATUS", ...}
//! ```
//!
//! # Components
//!
//! - [`InputEvent`]: gesture captured on the device
//! - [`WireMessage`]: envelope keyed by the `type` field
//! - [`RotaryDirection`], [`SwipeDirection`]: closed direction enums with a
//!   single case-insensitive parse path each
//! - [`encode`], [`encode_bounded`], [`decode`]: the codec
//!
//! # Invariants
//!
//! - Encoding is deterministic: equal messages produce identical bytes.
//! - A message larger than the peer limit is rejected, never truncated.
//! - Decoding then encoding a valid input event yields the same bytes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod codec;
mod direction;
pub mod errors;
mod message;

pub use codec::{decode, encode, encode_bounded};
pub use direction::{RotaryDirection, SwipeDirection};
pub use errors::{ProtocolError, Result};
pub use message::{InputEvent, InputKind, MessageType, WireMessage};
