//! Invariant checking for session testing.
//!
//! Invariants are properties that must hold after every step, whatever the
//! order of operations and completions. They are checked against a
//! [`LinkSnapshot`] taken from the dispatcher, the simulated transport and
//! the recorded listeners.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.check_all(&scenario.snapshot())?;
//! ```

use std::fmt;

use gearlink_core::{ChannelHandle, SessionState};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// Observable state of one link at a point in time.
#[derive(Debug, Clone)]
pub struct LinkSnapshot {
    /// Session state
    pub state: SessionState,
    /// Channel the session holds
    pub channel: Option<ChannelHandle>,
    /// Whether the session holds a peer
    pub has_peer: bool,
    /// Channels the transport considers open
    pub open_channels: Vec<ChannelHandle>,
    /// Connection listener invocations, oldest first
    pub connections: Vec<bool>,
}

/// A property that must hold for every snapshot.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    fn check(&self, state: &LinkSnapshot) -> InvariantResult;
}

/// Channel handle present iff Connected.
pub struct ChannelIffConnected;

impl Invariant for ChannelIffConnected {
    fn name(&self) -> &'static str {
        "channel_iff_connected"
    }

    fn check(&self, state: &LinkSnapshot) -> InvariantResult {
        let connected = state.state == SessionState::Connected;
        if connected == state.channel.is_some() {
            return Ok(());
        }
        Err(Violation {
            invariant: self.name(),
            message: format!("state {:?} with channel {:?}", state.state, state.channel),
        })
    }
}

/// Peer held exactly between discovery success and teardown.
pub struct PeerWhileLinked;

impl Invariant for PeerWhileLinked {
    fn name(&self) -> &'static str {
        "peer_while_linked"
    }

    fn check(&self, state: &LinkSnapshot) -> InvariantResult {
        let expected = matches!(
            state.state,
            SessionState::AwaitingServiceConnection | SessionState::Connected
        );
        if expected == state.has_peer {
            return Ok(());
        }
        Err(Violation {
            invariant: self.name(),
            message: format!("state {:?} with has_peer {}", state.state, state.has_peer),
        })
    }
}

/// The transport never holds a channel the session does not.
///
/// Catches orphans from superseded attempts that were never closed.
pub struct NoLeakedChannels;

impl Invariant for NoLeakedChannels {
    fn name(&self) -> &'static str {
        "no_leaked_channels"
    }

    fn check(&self, state: &LinkSnapshot) -> InvariantResult {
        let leaked: Vec<_> =
            state.open_channels.iter().filter(|open| Some(**open) != state.channel).collect();
        if leaked.is_empty() {
            return Ok(());
        }
        Err(Violation {
            invariant: self.name(),
            message: format!("open {leaked:?} while session holds {:?}", state.channel),
        })
    }
}

/// While Connected, the last thing the UI heard is "connected".
pub struct ConnectedWasReported;

impl Invariant for ConnectedWasReported {
    fn name(&self) -> &'static str {
        "connected_was_reported"
    }

    fn check(&self, state: &LinkSnapshot) -> InvariantResult {
        if state.state != SessionState::Connected || state.connections.last() == Some(&true) {
            return Ok(());
        }
        Err(Violation {
            invariant: self.name(),
            message: format!("connected but last report was {:?}", state.connections.last()),
        })
    }
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with every session invariant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ChannelIffConnected);
        registry.add(PeerWhileLinked);
        registry.add(NoLeakedChannels);
        registry.add(ConnectedWasReported);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants, collecting every violation.
    pub fn check_all(&self, state: &LinkSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
