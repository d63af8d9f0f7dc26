//! Property-based tests for the wire codec.
//!
//! Verifies round-trip and size-limit behaviour for all input kinds, not just
//! hand-picked examples.

use gearlink_proto::{
    InputEvent, ProtocolError, RotaryDirection, SwipeDirection, WireMessage, decode, encode,
    encode_bounded,
};
use proptest::prelude::*;

/// Strategy covering all seven input kinds
fn arbitrary_input() -> impl Strategy<Value = InputEvent> {
    let coord = any::<i32>();
    prop_oneof![
        (coord.clone(), coord.clone()).prop_map(|(x, y)| InputEvent::TouchStart { x, y }),
        (coord.clone(), coord.clone()).prop_map(|(x, y)| InputEvent::TouchMove { x, y }),
        Just(InputEvent::TouchEnd),
        (coord.clone(), coord).prop_map(|(x, y)| InputEvent::Click { x, y }),
        prop::sample::select(RotaryDirection::ALL.to_vec()).prop_map(InputEvent::Rotary),
        prop::sample::select(SwipeDirection::ALL.to_vec()).prop_map(InputEvent::Swipe),
        Just(InputEvent::Back),
    ]
}

proptest! {
    #[test]
    fn prop_input_roundtrip(event in arbitrary_input()) {
        let message = WireMessage::Input(event);
        let bytes = encode(&message).expect("encode should succeed");
        let decoded = decode(&bytes).expect("decode should succeed");

        prop_assert_eq!(decoded, message);
    }

    #[test]
    fn prop_encoding_is_deterministic(event in arbitrary_input()) {
        let message = WireMessage::Input(event);
        prop_assert_eq!(encode(&message).unwrap(), encode(&message).unwrap());
    }

    #[test]
    fn prop_size_limit_is_exact(event in arbitrary_input(), max in 0usize..96) {
        let message = WireMessage::Input(event);
        let size = encode(&message).unwrap().len();

        match encode_bounded(&message, max) {
            Ok(bytes) => {
                prop_assert!(size <= max);
                prop_assert_eq!(bytes.len(), size);
            },
            Err(ProtocolError::PayloadTooLarge { size: reported, max: limit }) => {
                prop_assert!(size > max);
                prop_assert_eq!(reported, size);
                prop_assert_eq!(limit, max);
            },
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode(&bytes);
    }

    #[test]
    fn prop_direction_parse_ignores_case(
        direction in prop::sample::select(SwipeDirection::ALL.to_vec()),
        mask in prop::collection::vec(any::<bool>(), 5),
    ) {
        let mixed: String = direction
            .as_str()
            .chars()
            .zip(mask.iter().cycle())
            .map(|(c, lower)| if *lower { c.to_ascii_lowercase() } else { c })
            .collect();

        prop_assert_eq!(mixed.parse::<SwipeDirection>(), Ok(direction));
    }
}

#[test]
fn unknown_type_survives_roundtrip() {
    let bytes = br#"{"type":"BATTERY","level":80}"#;
    let message = decode(bytes).unwrap();

    assert_eq!(message.type_name(), "BATTERY");
    assert_eq!(encode(&message).unwrap(), bytes.to_vec());
}
