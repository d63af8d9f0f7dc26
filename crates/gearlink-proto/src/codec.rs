//! JSON codec.
//!
//! INPUT messages are written through a fixed-order struct so the key order
//! is always `type`, `event`, then `x`/`y` or `direction`. Control messages
//! write `type` first followed by their fields in map order. Either way the
//! same message always produces the same bytes.

use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};

use crate::{
    direction::{RotaryDirection, SwipeDirection},
    errors::{ProtocolError, Result},
    message::{InputEvent, InputKind, MessageType, WireMessage},
};

/// Outbound shape of an INPUT message.
#[derive(Serialize)]
struct InputEnvelope {
    #[serde(rename = "type")]
    kind: &'static str,
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<&'static str>,
}

impl From<&InputEvent> for InputEnvelope {
    fn from(event: &InputEvent) -> Self {
        let (x, y) = event.position().unzip();
        let direction = match event {
            InputEvent::Rotary(d) => Some(d.as_str()),
            InputEvent::Swipe(d) => Some(d.as_str()),
            _ => None,
        };

        Self {
            kind: MessageType::Input.as_str(),
            event: event.kind().as_str(),
            x,
            y,
            direction,
        }
    }
}

/// Inbound shape of an INPUT message. Extra keys are ignored.
#[derive(Deserialize)]
struct RawInput {
    event: String,
    x: Option<i32>,
    y: Option<i32>,
    direction: Option<String>,
}

/// Encode a message to JSON bytes without a size limit.
///
/// # Errors
///
/// - `ProtocolError::Encode` if serialization fails
pub fn encode(message: &WireMessage) -> Result<Vec<u8>> {
    match message {
        WireMessage::Input(event) => serde_json::to_vec(&InputEnvelope::from(event))
            .map_err(|e| ProtocolError::Encode(e.to_string())),
        WireMessage::ConnectionStatus(fields) => {
            encode_tagged(MessageType::ConnectionStatus.as_str(), fields)
        },
        WireMessage::Error(fields) => encode_tagged(MessageType::Error.as_str(), fields),
        WireMessage::Unknown { kind, fields } => encode_tagged(kind, fields),
    }
}

/// Encode a message, rejecting it if the result exceeds `max` bytes.
///
/// The check is on the encoded byte length. Oversized messages are never
/// truncated; the caller must not send anything.
///
/// # Errors
///
/// - `ProtocolError::PayloadTooLarge` if the encoded size exceeds `max`
/// - `ProtocolError::Encode` if serialization fails
pub fn encode_bounded(message: &WireMessage, max: usize) -> Result<Vec<u8>> {
    let bytes = encode(message)?;
    if bytes.len() > max {
        return Err(ProtocolError::PayloadTooLarge { size: bytes.len(), max });
    }
    Ok(bytes)
}

/// Decode one message.
///
/// Unrecognised `type` values decode to [`WireMessage::Unknown`].
///
/// # Errors
///
/// - `ProtocolError::MalformedMessage` if the bytes are not a JSON object,
///   `type` is missing or not a string, or an INPUT message names an unknown
///   event or lacks the fields its event requires
/// - `ProtocolError::InvalidDirection` if an INPUT direction is not a member
///   of its enum
pub fn decode(bytes: &[u8]) -> Result<WireMessage> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::malformed(e.to_string()))?;

    let Value::Object(mut fields) = value else {
        return Err(ProtocolError::malformed("expected a JSON object"));
    };

    let kind = match fields.remove("type") {
        Some(Value::String(kind)) => kind,
        Some(other) => {
            return Err(ProtocolError::malformed(format!("`type` must be a string, got {other}")));
        },
        None => return Err(ProtocolError::malformed("missing `type`")),
    };

    match MessageType::from_wire(&kind) {
        Some(MessageType::Input) => decode_input(fields).map(WireMessage::Input),
        Some(MessageType::ConnectionStatus) => Ok(WireMessage::ConnectionStatus(fields)),
        Some(MessageType::Error) => Ok(WireMessage::Error(fields)),
        None => Ok(WireMessage::Unknown { kind, fields }),
    }
}

fn decode_input(fields: Map<String, Value>) -> Result<InputEvent> {
    let raw: RawInput = serde_json::from_value(Value::Object(fields))
        .map_err(|e| ProtocolError::malformed(format!("bad INPUT body: {e}")))?;

    let Some(kind) = InputKind::from_wire(&raw.event) else {
        return Err(ProtocolError::malformed(format!("unknown input event {:?}", raw.event)));
    };

    let point = || match (raw.x, raw.y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(ProtocolError::malformed(format!("{} requires x and y", kind.as_str()))),
    };
    let direction = || {
        raw.direction.as_deref().ok_or_else(|| {
            ProtocolError::malformed(format!("{} requires direction", kind.as_str()))
        })
    };

    let event = match kind {
        InputKind::TouchStart => {
            let (x, y) = point()?;
            InputEvent::TouchStart { x, y }
        },
        InputKind::TouchMove => {
            let (x, y) = point()?;
            InputEvent::TouchMove { x, y }
        },
        InputKind::Click => {
            let (x, y) = point()?;
            InputEvent::Click { x, y }
        },
        InputKind::TouchEnd => InputEvent::TouchEnd,
        InputKind::Back => InputEvent::Back,
        InputKind::Rotary => InputEvent::Rotary(direction()?.parse::<RotaryDirection>()?),
        InputKind::Swipe => InputEvent::Swipe(direction()?.parse::<SwipeDirection>()?),
    };

    Ok(event)
}

fn encode_tagged(kind: &str, fields: &Map<String, Value>) -> Result<Vec<u8>> {
    write_tagged(kind, fields).map_err(|e| ProtocolError::Encode(e.to_string()))
}

fn write_tagged(kind: &str, fields: &Map<String, Value>) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut serializer = serde_json::Serializer::new(&mut out);
        let mut map = (&mut serializer).serialize_map(None)?;
        map.serialize_entry("type", kind)?;
        // A stray `type` key in the fields would produce a duplicate key
        for (key, value) in fields.iter().filter(|(key, _)| key.as_str() != "type") {
            map.serialize_entry(key, value)?;
        }
        map.end()?;
    }
    Ok(out)
}
