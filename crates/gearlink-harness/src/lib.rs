//! Simulation harness for GearLink testing.
//!
//! In-memory implementations of the transport and listener contracts so the
//! same [`gearlink_app::Dispatcher`] and [`gearlink_app::Runtime`] code runs
//! in tests and in the loopback binary.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold after every
//! step of any operation/completion sequence. Use
//! [`InvariantRegistry::standard()`] for the session invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod recorder;
pub mod scenario;
pub mod sim_transport;

pub use invariants::{
    ChannelIffConnected, ConnectedWasReported, Invariant, InvariantRegistry, InvariantResult,
    LinkSnapshot, NoLeakedChannels, PeerWhileLinked, Violation,
};
pub use recorder::Recorder;
pub use scenario::{DEFAULT_MAX_PAYLOAD, Scenario};
pub use sim_transport::{Call, SimTransport};
