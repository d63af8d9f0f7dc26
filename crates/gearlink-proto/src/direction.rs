//! Rotary and swipe directions.
//!
//! Devices report directions in inconsistent case ("cw", "up", "LEFT"), so
//! each enum has exactly one parse path and it ignores ASCII case. The wire
//! form is always upper-case.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ProtocolError;

/// Bezel rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotaryDirection {
    /// Clockwise
    Cw,
    /// Counter-clockwise
    Ccw,
}

impl RotaryDirection {
    /// Every variant, in wire order.
    pub const ALL: [Self; 2] = [Self::Cw, Self::Ccw];

    /// Wire name of this direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cw => "CW",
            Self::Ccw => "CCW",
        }
    }
}

impl FromStr for RotaryDirection {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|d| d.as_str().eq_ignore_ascii_case(s)).ok_or_else(|| {
            ProtocolError::InvalidDirection { kind: "rotary", value: s.to_string() }
        })
    }
}

/// Touchscreen swipe direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
    /// Swipe up
    Up,
    /// Swipe down
    Down,
    /// Swipe left
    Left,
    /// Swipe right
    Right,
}

impl SwipeDirection {
    /// Every variant, in wire order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Wire name of this direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

impl FromStr for SwipeDirection {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|d| d.as_str().eq_ignore_ascii_case(s)).ok_or_else(|| {
            ProtocolError::InvalidDirection { kind: "swipe", value: s.to_string() }
        })
    }
}

macro_rules! direction_serde {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

direction_serde!(RotaryDirection);
direction_serde!(SwipeDirection);
