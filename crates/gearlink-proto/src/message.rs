//! Message types carried over the link.

use serde_json::{Map, Value};

use crate::{
    direction::{RotaryDirection, SwipeDirection},
    errors::Result,
};

/// Value of the envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Link status report from the peer
    ConnectionStatus,
    /// Error report from the peer
    Error,
    /// Gesture event
    Input,
}

impl MessageType {
    /// Wire name of this message type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionStatus => "CONNECTION_STATUS",
            Self::Error => "ERROR",
            Self::Input => "INPUT",
        }
    }

    /// Look up a wire name. Exact match; `None` for types this build does not
    /// know.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "CONNECTION_STATUS" => Some(Self::ConnectionStatus),
            "ERROR" => Some(Self::Error),
            "INPUT" => Some(Self::Input),
            _ => None,
        }
    }
}

/// Value of the envelope's `event` field for INPUT messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Finger down
    TouchStart,
    /// Finger moved while down
    TouchMove,
    /// Finger up
    TouchEnd,
    /// Tap
    Click,
    /// Bezel rotation
    Rotary,
    /// Swipe gesture
    Swipe,
    /// Hardware back button
    Back,
}

impl InputKind {
    /// Every kind, in wire order.
    pub const ALL: [Self; 7] = [
        Self::TouchStart,
        Self::TouchMove,
        Self::TouchEnd,
        Self::Click,
        Self::Rotary,
        Self::Swipe,
        Self::Back,
    ];

    /// Wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TouchStart => "TOUCH_START",
            Self::TouchMove => "TOUCH_MOVE",
            Self::TouchEnd => "TOUCH_END",
            Self::Click => "CLICK",
            Self::Rotary => "ROTARY",
            Self::Swipe => "SWIPE",
            Self::Back => "BACK",
        }
    }

    /// Look up a wire name (exact match).
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// A gesture captured on the device.
///
/// Each variant carries only the fields its kind needs: coordinates for
/// touch and click, a direction for rotary and swipe, nothing otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Finger down at (x, y)
    TouchStart {
        /// Horizontal coordinate
        x: i32,
        /// Vertical coordinate
        y: i32,
    },
    /// Finger moved to (x, y)
    TouchMove {
        /// Horizontal coordinate
        x: i32,
        /// Vertical coordinate
        y: i32,
    },
    /// Finger up
    TouchEnd,
    /// Tap at (x, y)
    Click {
        /// Horizontal coordinate
        x: i32,
        /// Vertical coordinate
        y: i32,
    },
    /// Bezel rotated one detent
    Rotary(RotaryDirection),
    /// Swipe gesture
    Swipe(SwipeDirection),
    /// Back button pressed
    Back,
}

impl InputEvent {
    /// Rotary event from a device direction string (case-insensitive).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidDirection` if `direction` is not CW or CCW
    pub fn rotary(direction: &str) -> Result<Self> {
        Ok(Self::Rotary(direction.parse()?))
    }

    /// Swipe event from a device direction string (case-insensitive).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidDirection` if `direction` is not one of
    ///   UP, DOWN, LEFT, RIGHT
    pub fn swipe(direction: &str) -> Result<Self> {
        Ok(Self::Swipe(direction.parse()?))
    }

    /// Kind of this event.
    pub const fn kind(&self) -> InputKind {
        match self {
            Self::TouchStart { .. } => InputKind::TouchStart,
            Self::TouchMove { .. } => InputKind::TouchMove,
            Self::TouchEnd => InputKind::TouchEnd,
            Self::Click { .. } => InputKind::Click,
            Self::Rotary(_) => InputKind::Rotary,
            Self::Swipe(_) => InputKind::Swipe,
            Self::Back => InputKind::Back,
        }
    }

    /// Coordinates for touch and click events.
    pub const fn position(&self) -> Option<(i32, i32)> {
        match *self {
            Self::TouchStart { x, y } | Self::TouchMove { x, y } | Self::Click { x, y } => {
                Some((x, y))
            },
            _ => None,
        }
    }
}

/// Envelope exchanged over the channel.
///
/// Control messages (`CONNECTION_STATUS`, `ERROR`) keep every field other
/// than `type` as sent, so hosts can extend them without a protocol bump.
/// Types this build does not recognise decode to [`WireMessage::Unknown`]
/// instead of failing; the receiver decides what to do with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// `CONNECTION_STATUS` with its remaining fields
    ConnectionStatus(Map<String, Value>),
    /// `ERROR` with its remaining fields
    Error(Map<String, Value>),
    /// `INPUT` carrying a gesture
    Input(InputEvent),
    /// Any other `type`
    Unknown {
        /// Raw `type` value
        kind: String,
        /// Remaining fields
        fields: Map<String, Value>,
    },
}

impl WireMessage {
    /// Recognised message type. `None` for [`WireMessage::Unknown`].
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            Self::ConnectionStatus(_) => Some(MessageType::ConnectionStatus),
            Self::Error(_) => Some(MessageType::Error),
            Self::Input(_) => Some(MessageType::Input),
            Self::Unknown { .. } => None,
        }
    }

    /// Raw value of the `type` field.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Unknown { kind, .. } => kind,
            Self::ConnectionStatus(_) => MessageType::ConnectionStatus.as_str(),
            Self::Error(_) => MessageType::Error.as_str(),
            Self::Input(_) => MessageType::Input.as_str(),
        }
    }

    /// Gesture carried by an INPUT message.
    pub fn as_input(&self) -> Option<&InputEvent> {
        match self {
            Self::Input(event) => Some(event),
            _ => None,
        }
    }
}

impl From<InputEvent> for WireMessage {
    fn from(event: InputEvent) -> Self {
        Self::Input(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_kind_wire_names_are_unique() {
        for kind in InputKind::ALL {
            assert_eq!(InputKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(InputKind::from_wire("click"), None);
    }

    #[test]
    fn message_type_lookup_is_exact() {
        assert_eq!(MessageType::from_wire("INPUT"), Some(MessageType::Input));
        assert_eq!(MessageType::from_wire("input"), None);
        assert_eq!(MessageType::from_wire("HEARTBEAT"), None);
    }

    #[test]
    fn direction_constructors_reject_unknown_strings() {
        assert_eq!(InputEvent::rotary("cw"), Ok(InputEvent::Rotary(RotaryDirection::Cw)));
        assert_eq!(InputEvent::swipe("left"), Ok(InputEvent::Swipe(SwipeDirection::Left)));
        assert!(InputEvent::rotary("unknown").is_err());
        assert!(InputEvent::swipe("sideways").is_err());
    }

    #[test]
    fn position_only_for_pointer_events() {
        assert_eq!(InputEvent::Click { x: 1, y: 2 }.position(), Some((1, 2)));
        assert_eq!(InputEvent::TouchEnd.position(), None);
        assert_eq!(InputEvent::Rotary(RotaryDirection::Ccw).position(), None);
    }

    #[test]
    fn unknown_message_reports_raw_type() {
        let message = WireMessage::Unknown { kind: "HEARTBEAT".into(), fields: Map::new() };
        assert_eq!(message.type_name(), "HEARTBEAT");
        assert_eq!(message.message_type(), None);
    }
}
