//! Session state machine.
//!
//! Owns the lifecycle of the single logical connection to the host peer.
//! Uses the action pattern: operations and transport completions return
//! actions for the driver to execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ connect ┌─────────────┐ peer found ┌───────────────────────────┐
//! │ Idle │────────>│ Discovering │───────────>│ AwaitingServiceConnection │
//! └──────┘         └─────────────┘            └───────────────────────────┘
//!    ^                    │ error / wrong peer        │ connected    │ error
//!    │                    ↓                           ↓              │
//!    │<──────────── disconnect / loss ──────── ┌───────────┐         │
//!    │<──────────────────────────────────────  │ Connected │ <───────┘ (to Idle)
//!    │                                         └───────────┘
//!    │ reset   ┌────────┐
//!    └─────────│ Failed │<── transport failure (from any state)
//!              └────────┘
//! ```
//!
//! # Stale completions
//!
//! Completions can arrive after the request that caused them was cancelled.
//! Discovery and service-connection results carry the [`Attempt`] that
//! issued them; channel events carry the [`ChannelHandle`]. Anything that
//! does not match the current attempt and state, or the current handle, is
//! discarded. A stale `ServiceConnected` still produces a `CloseChannel` so
//! the orphaned channel is not leaked.

use std::fmt;

use crate::{
    error::{LinkError, SessionError},
    transport::{
        Attempt, ChannelHandle, DEFAULT_CHANNEL_ID, DeviceStatus, LossReason, Peer,
        TransportEvent,
    },
};

/// Application name of the host-side input provider.
pub const DEFAULT_PROVIDER_APP_NAME: &str = "GearInputProvider";

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Application name a discovered peer must advertise
    pub provider_app_name: String,
    /// Logical channel id used for every message
    pub channel_id: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider_app_name: DEFAULT_PROVIDER_APP_NAME.to_string(),
            channel_id: DEFAULT_CHANNEL_ID,
        }
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection, nothing in flight
    Idle,
    /// Peer discovery requested
    Discovering,
    /// Matching peer found, service connection requested
    AwaitingServiceConnection,
    /// Channel open
    Connected,
    /// Transport unusable; only `reset` leaves this state
    Failed,
}

/// Whether a local disconnect tells the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectMode {
    /// Notify the connection listener and raise a notice
    Notify,
    /// Intentional teardown; no notifications
    Silent,
}

/// Transient user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Channel established with the named peer
    Connected {
        /// Peer application name
        peer: String,
    },
    /// Local disconnect completed
    Disconnected,
    /// Disconnect requested while nothing was connected
    AlreadyDisconnected,
    /// Connection attempt failed or an established link went away
    LinkFailed(LinkError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { peer } => write!(f, "Connection established with {peer}"),
            Self::Disconnected => f.write_str("Disconnected from peer"),
            Self::AlreadyDisconnected => f.write_str("Already disconnected"),
            Self::LinkFailed(err) if err.is_transient() => write!(f, "{err}"),
            Self::LinkFailed(err) => write!(f, "{err}, reset required"),
        }
    }
}

/// Actions returned by the session state machine.
///
/// The driver executes these in order:
/// - `DiscoverPeers`, `RequestServiceConnection`, `CloseChannel`: call the
///   transport; a failed request is fed back as the matching failure event
/// - `ConnectionChanged`: invoke the connection listener
/// - `Notify`: show a transient notice
/// - `Deliver`: decode and dispatch an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Start peer discovery
    DiscoverPeers {
        /// Attempt to tag completions with
        attempt: Attempt,
    },

    /// Request a service connection to the peer
    RequestServiceConnection {
        /// Attempt to tag completions with
        attempt: Attempt,
        /// Matching peer
        peer: Peer,
    },

    /// Close a channel (no-op if already closed)
    CloseChannel(ChannelHandle),

    /// Connection state visible to the UI changed
    ConnectionChanged {
        /// True once connected, false on failure or loss
        connected: bool,
    },

    /// Show a notice
    Notify(Notice),

    /// Inbound message bytes from the current channel
    Deliver(Vec<u8>),
}

/// Session state machine
///
/// One logical connection to one peer. The channel handle is held exactly
/// while the state is [`SessionState::Connected`].
#[derive(Debug, Clone)]
pub struct Session {
    /// Configuration
    config: SessionConfig,
    /// Current state
    state: SessionState,
    /// Open channel. `Some` only while connected.
    channel: Option<ChannelHandle>,
    /// Matching peer. `Some` from discovery until teardown.
    peer: Option<Peer>,
    /// Most recent connect attempt
    attempt: Attempt,
}

impl Session {
    /// Create a new session in [`SessionState::Idle`].
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            channel: None,
            peer: None,
            attempt: Attempt::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Open channel. `None` unless connected.
    pub fn channel(&self) -> Option<ChannelHandle> {
        self.channel
    }

    /// Peer selected by discovery. `None` before discovery succeeds.
    pub fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    /// Most recent connect attempt.
    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// True while a channel is open.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Peer-advertised message size limit. `None` unless connected.
    pub fn max_payload(&self) -> Option<usize> {
        if self.is_connected() { self.peer.as_ref().map(|p| p.max_data_size) } else { None }
    }

    /// Start a new connection attempt.
    ///
    /// Transitions to Discovering and returns `DiscoverPeers`.
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyConnected` if a channel is open
    /// - `SessionError::AlreadyConnecting` while discovering or awaiting the
    ///   service connection
    /// - `SessionError::InvalidState` from Failed (reset first)
    pub fn connect(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        if self.channel.is_some() {
            return Err(SessionError::AlreadyConnected);
        }

        match self.state {
            SessionState::Idle => {},
            SessionState::Discovering | SessionState::AwaitingServiceConnection => {
                return Err(SessionError::AlreadyConnecting);
            },
            SessionState::Connected => return Err(SessionError::AlreadyConnected),
            SessionState::Failed => {
                return Err(SessionError::InvalidState { state: self.state, operation: "connect" });
            },
        }

        self.attempt = self.attempt.next();
        self.state = SessionState::Discovering;
        tracing::debug!(attempt = %self.attempt, "discovering peers");

        Ok(vec![SessionAction::DiscoverPeers { attempt: self.attempt }])
    }

    /// Tear down the connection or cancel the attempt in progress.
    ///
    /// From Idle or Failed this is a no-op: nothing is closed and the
    /// connection listener is not invoked.
    pub fn disconnect(&mut self, mode: DisconnectMode) -> Vec<SessionAction> {
        match self.state {
            SessionState::Idle | SessionState::Failed => {
                tracing::debug!(state = ?self.state, "not disconnecting, already disconnected");
                match mode {
                    DisconnectMode::Notify => {
                        vec![SessionAction::Notify(Notice::AlreadyDisconnected)]
                    },
                    DisconnectMode::Silent => vec![],
                }
            },
            SessionState::Discovering
            | SessionState::AwaitingServiceConnection
            | SessionState::Connected => {
                tracing::info!(state = ?self.state, ?mode, "disconnecting");
                let mut actions = self.teardown();
                if mode == DisconnectMode::Notify {
                    actions.push(SessionAction::ConnectionChanged { connected: false });
                    actions.push(SessionAction::Notify(Notice::Disconnected));
                }
                actions
            },
        }
    }

    /// Leave Failed for Idle. No-op in any other state.
    pub fn reset(&mut self) -> Vec<SessionAction> {
        if self.state == SessionState::Failed {
            tracing::info!("session reset");
            self.state = SessionState::Idle;
        }
        vec![]
    }

    /// Silent teardown from any state, ending in Idle or Failed.
    ///
    /// A failed session stays Failed until `reset`. The attempt counter
    /// survives so completions from before the destroy are still recognised
    /// as stale.
    pub fn destroy(&mut self) -> Vec<SessionAction> {
        tracing::debug!(state = ?self.state, "destroying session");
        let failed = self.state == SessionState::Failed;
        let actions = self.teardown();
        if failed {
            self.state = SessionState::Failed;
        }
        actions
    }

    /// Process a transport completion.
    pub fn handle(&mut self, event: TransportEvent) -> Vec<SessionAction> {
        match event {
            TransportEvent::PeerFound { attempt, peer } => self.handle_peer_found(attempt, peer),

            TransportEvent::DiscoveryFailed { attempt, reason } => {
                if self.is_current(attempt, SessionState::Discovering) {
                    self.fail_attempt(LinkError::Discovery(reason))
                } else {
                    tracing::debug!(%attempt, %reason, "discarding stale discovery error");
                    vec![]
                }
            },

            TransportEvent::ServiceConnected { attempt, channel } => {
                self.handle_service_connected(attempt, channel)
            },

            TransportEvent::ServiceConnectionFailed { attempt, reason } => {
                if self.is_current(attempt, SessionState::AwaitingServiceConnection) {
                    self.fail_attempt(LinkError::ServiceConnection(reason))
                } else {
                    tracing::debug!(%attempt, %reason, "discarding stale service connection error");
                    vec![]
                }
            },

            TransportEvent::ChannelLost { channel, reason } => {
                self.handle_channel_lost(channel, reason)
            },

            TransportEvent::DataReceived { channel, channel_id, data } => {
                if !self.is_current_channel(channel) {
                    tracing::debug!(%channel, "discarding data for stale channel");
                    return vec![];
                }
                if channel_id != self.config.channel_id {
                    tracing::warn!(
                        channel_id,
                        expected = self.config.channel_id,
                        "discarding data on unexpected channel id"
                    );
                    return vec![];
                }
                vec![SessionAction::Deliver(data)]
            },

            TransportEvent::DeviceStatusChanged(status) => {
                match status {
                    DeviceStatus::Attached => tracing::info!("attached to host"),
                    DeviceStatus::Detached => tracing::info!("detached from host"),
                }
                vec![]
            },

            TransportEvent::TransportFailed { reason } => self.handle_transport_failed(reason),
        }
    }

    fn handle_peer_found(&mut self, attempt: Attempt, peer: Peer) -> Vec<SessionAction> {
        if !self.is_current(attempt, SessionState::Discovering) {
            tracing::debug!(%attempt, peer = %peer.app_name, "discarding stale peer");
            return vec![];
        }

        if peer.app_name != self.config.provider_app_name {
            tracing::warn!(peer = %peer.app_name, "found unexpected peer");
            return self.fail_attempt(LinkError::UnexpectedPeer {
                expected: self.config.provider_app_name.clone(),
                found: peer.app_name,
            });
        }

        tracing::info!(peer = %peer.app_name, %attempt, "requesting service connection");
        self.state = SessionState::AwaitingServiceConnection;
        self.peer = Some(peer.clone());

        vec![SessionAction::RequestServiceConnection { attempt, peer }]
    }

    fn handle_service_connected(
        &mut self,
        attempt: Attempt,
        channel: ChannelHandle,
    ) -> Vec<SessionAction> {
        if self.channel == Some(channel) {
            tracing::debug!(%attempt, %channel, "ignoring repeated service connection");
            return vec![];
        }

        if !self.is_current(attempt, SessionState::AwaitingServiceConnection) {
            tracing::debug!(%attempt, %channel, "closing channel from superseded attempt");
            return vec![SessionAction::CloseChannel(channel)];
        }

        let peer = self.peer.as_ref().map(|p| p.app_name.clone()).unwrap_or_default();
        tracing::info!(%peer, %channel, "connected");

        self.channel = Some(channel);
        self.state = SessionState::Connected;

        vec![
            SessionAction::ConnectionChanged { connected: true },
            SessionAction::Notify(Notice::Connected { peer }),
        ]
    }

    fn handle_channel_lost(
        &mut self,
        channel: ChannelHandle,
        reason: LossReason,
    ) -> Vec<SessionAction> {
        if !self.is_current_channel(channel) {
            tracing::debug!(%channel, %reason, "discarding loss of stale channel");
            return vec![];
        }

        tracing::warn!(%channel, %reason, "service connection lost");
        let mut actions = self.teardown();
        actions.push(SessionAction::ConnectionChanged { connected: false });
        actions.push(SessionAction::Notify(Notice::LinkFailed(LinkError::ChannelLost(reason))));
        actions
    }

    fn handle_transport_failed(&mut self, reason: String) -> Vec<SessionAction> {
        if self.state == SessionState::Failed {
            tracing::debug!(%reason, "transport already failed");
            return vec![];
        }

        tracing::error!(%reason, state = ?self.state, "transport failed");
        let was_active = self.state != SessionState::Idle;
        let mut actions = self.teardown();
        self.state = SessionState::Failed;

        if was_active {
            actions.push(SessionAction::ConnectionChanged { connected: false });
        }
        actions.push(SessionAction::Notify(Notice::LinkFailed(LinkError::Transport(reason))));
        actions
    }

    /// Abandon the attempt in progress and report why.
    fn fail_attempt(&mut self, error: LinkError) -> Vec<SessionAction> {
        tracing::warn!(%error, attempt = %self.attempt, "connection attempt failed");
        let mut actions = self.teardown();
        actions.push(SessionAction::ConnectionChanged { connected: false });
        actions.push(SessionAction::Notify(Notice::LinkFailed(error)));
        actions
    }

    /// Drop all per-connection state and return to Idle.
    fn teardown(&mut self) -> Vec<SessionAction> {
        self.peer = None;
        self.state = SessionState::Idle;
        self.channel.take().map(SessionAction::CloseChannel).into_iter().collect()
    }

    fn is_current(&self, attempt: Attempt, expected: SessionState) -> bool {
        attempt == self.attempt && self.state == expected
    }

    fn is_current_channel(&self, channel: ChannelHandle) -> bool {
        self.state == SessionState::Connected && self.channel == Some(channel)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn provider() -> Peer {
        Peer::new(DEFAULT_PROVIDER_APP_NAME, 1024)
    }

    fn connected_session() -> (Session, ChannelHandle) {
        let mut session = Session::new(SessionConfig::default());
        session.connect().unwrap();
        let attempt = session.attempt();
        session.handle(TransportEvent::PeerFound { attempt, peer: provider() });
        let channel = ChannelHandle::new(7);
        session.handle(TransportEvent::ServiceConnected { attempt, channel });
        assert_eq!(session.state(), SessionState::Connected);
        (session, channel)
    }

    #[test]
    fn connection_lifecycle() {
        let mut session = Session::new(SessionConfig::default());
        assert_eq!(session.state(), SessionState::Idle);

        let actions = session.connect().unwrap();
        let attempt = session.attempt();
        assert_eq!(session.state(), SessionState::Discovering);
        assert_eq!(actions, vec![SessionAction::DiscoverPeers { attempt }]);

        let actions = session.handle(TransportEvent::PeerFound { attempt, peer: provider() });
        assert_eq!(session.state(), SessionState::AwaitingServiceConnection);
        assert_eq!(actions, vec![SessionAction::RequestServiceConnection {
            attempt,
            peer: provider()
        }]);

        let channel = ChannelHandle::new(1);
        let actions = session.handle(TransportEvent::ServiceConnected { attempt, channel });
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.channel(), Some(channel));
        assert_eq!(session.max_payload(), Some(1024));
        assert_eq!(actions, vec![
            SessionAction::ConnectionChanged { connected: true },
            SessionAction::Notify(Notice::Connected { peer: DEFAULT_PROVIDER_APP_NAME.into() }),
        ]);

        let actions = session.disconnect(DisconnectMode::Notify);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.channel(), None);
        assert_eq!(actions, vec![
            SessionAction::CloseChannel(channel),
            SessionAction::ConnectionChanged { connected: false },
            SessionAction::Notify(Notice::Disconnected),
        ]);
    }

    #[test]
    fn connect_rejected_while_in_progress_or_connected() {
        let mut session = Session::new(SessionConfig::default());
        session.connect().unwrap();
        assert_eq!(session.connect(), Err(SessionError::AlreadyConnecting));

        let (mut session, _) = connected_session();
        assert_eq!(session.connect(), Err(SessionError::AlreadyConnected));
    }

    #[test]
    fn unexpected_peer_fails_attempt() {
        let mut session = Session::new(SessionConfig::default());
        session.connect().unwrap();
        let attempt = session.attempt();

        let actions = session
            .handle(TransportEvent::PeerFound { attempt, peer: Peer::new("OtherApp", 1024) });

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.peer().is_none());
        assert_eq!(actions, vec![
            SessionAction::ConnectionChanged { connected: false },
            SessionAction::Notify(Notice::LinkFailed(LinkError::UnexpectedPeer {
                expected: DEFAULT_PROVIDER_APP_NAME.into(),
                found: "OtherApp".into(),
            })),
        ]);
    }

    #[test]
    fn service_connection_error_returns_to_idle() {
        let mut session = Session::new(SessionConfig::default());
        session.connect().unwrap();
        let attempt = session.attempt();
        session.handle(TransportEvent::PeerFound { attempt, peer: provider() });

        let actions = session.handle(TransportEvent::ServiceConnectionFailed {
            attempt,
            reason: "refused".into(),
        });

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.peer().is_none());
        assert!(actions.contains(&SessionAction::ConnectionChanged { connected: false }));
    }

    #[test]
    fn second_disconnect_is_noop() {
        let (mut session, _) = connected_session();
        session.disconnect(DisconnectMode::Notify);

        let actions = session.disconnect(DisconnectMode::Notify);
        assert_eq!(actions, vec![SessionAction::Notify(Notice::AlreadyDisconnected)]);
        assert!(session.disconnect(DisconnectMode::Silent).is_empty());
    }

    #[test]
    fn silent_disconnect_only_closes() {
        let (mut session, channel) = connected_session();
        let actions = session.disconnect(DisconnectMode::Silent);
        assert_eq!(actions, vec![SessionAction::CloseChannel(channel)]);
    }

    #[test]
    fn channel_loss_notifies_and_clears() {
        let (mut session, channel) = connected_session();

        let actions = session
            .handle(TransportEvent::ChannelLost { channel, reason: LossReason::DeviceDetached });

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(actions, vec![
            SessionAction::CloseChannel(channel),
            SessionAction::ConnectionChanged { connected: false },
            SessionAction::Notify(Notice::LinkFailed(LinkError::ChannelLost(
                LossReason::DeviceDetached
            ))),
        ]);
    }

    #[test]
    fn loss_of_stale_channel_is_discarded() {
        let (mut session, channel) = connected_session();
        let stale = ChannelHandle::new(channel.id() + 100);

        let actions = session
            .handle(TransportEvent::ChannelLost { channel: stale, reason: LossReason::Fatal });

        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[test]
    fn service_connected_after_cancel_closes_orphan() {
        let mut session = Session::new(SessionConfig::default());
        session.connect().unwrap();
        let old = session.attempt();
        session.handle(TransportEvent::PeerFound { attempt: old, peer: provider() });
        session.disconnect(DisconnectMode::Silent);

        // A fresh attempt is in discovery when the old one completes
        session.connect().unwrap();
        let orphan = ChannelHandle::new(3);
        let actions =
            session.handle(TransportEvent::ServiceConnected { attempt: old, channel: orphan });

        assert_eq!(actions, vec![SessionAction::CloseChannel(orphan)]);
        assert_eq!(session.state(), SessionState::Discovering);
        assert_eq!(session.channel(), None);
    }

    #[test]
    fn repeated_service_connection_keeps_live_channel() {
        let (mut session, channel) = connected_session();
        let attempt = session.attempt();

        let actions = session.handle(TransportEvent::ServiceConnected { attempt, channel });

        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.channel(), Some(channel));

        // A different handle for the same attempt is still an orphan
        let extra = ChannelHandle::new(8);
        let actions = session.handle(TransportEvent::ServiceConnected { attempt, channel: extra });
        assert_eq!(actions, vec![SessionAction::CloseChannel(extra)]);
        assert_eq!(session.channel(), Some(channel));
    }

    #[test]
    fn data_filtered_by_channel_and_id() {
        let (mut session, channel) = connected_session();

        let delivered = session.handle(TransportEvent::DataReceived {
            channel,
            channel_id: DEFAULT_CHANNEL_ID,
            data: b"{}".to_vec(),
        });
        assert_eq!(delivered, vec![SessionAction::Deliver(b"{}".to_vec())]);

        let wrong_id = session.handle(TransportEvent::DataReceived {
            channel,
            channel_id: DEFAULT_CHANNEL_ID + 1,
            data: b"{}".to_vec(),
        });
        assert!(wrong_id.is_empty());

        let wrong_channel = session.handle(TransportEvent::DataReceived {
            channel: ChannelHandle::new(channel.id() + 1),
            channel_id: DEFAULT_CHANNEL_ID,
            data: b"{}".to_vec(),
        });
        assert!(wrong_channel.is_empty());
    }

    #[test]
    fn transport_failure_requires_reset() {
        let (mut session, channel) = connected_session();

        let actions = session.handle(TransportEvent::TransportFailed { reason: "gone".into() });
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(actions[0], SessionAction::CloseChannel(channel));
        assert!(actions.contains(&SessionAction::ConnectionChanged { connected: false }));

        assert!(matches!(session.connect(), Err(SessionError::InvalidState { .. })));
        assert!(session.disconnect(DisconnectMode::Silent).is_empty());

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.connect().is_ok());
    }

    #[test]
    fn destroy_leaves_idle_and_keeps_attempt_counter() {
        let (mut session, channel) = connected_session();
        let attempt = session.attempt();

        assert_eq!(session.destroy(), vec![SessionAction::CloseChannel(channel)]);
        assert_eq!(session.state(), SessionState::Idle);

        session.connect().unwrap();
        assert!(session.attempt() > attempt);
    }

    #[test]
    fn destroy_does_not_clear_failure() {
        let (mut session, _) = connected_session();
        session.handle(TransportEvent::TransportFailed { reason: "gone".into() });

        assert!(session.destroy().is_empty());
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.channel(), None);
        assert!(matches!(session.connect(), Err(SessionError::InvalidState { .. })));

        session.reset();
        assert!(session.connect().is_ok());
    }

    #[test]
    fn only_transport_failure_asks_for_reset() {
        let lost = Notice::LinkFailed(LinkError::ChannelLost(LossReason::PeerDisconnected));
        assert!(!lost.to_string().contains("reset"));

        let failed = Notice::LinkFailed(LinkError::Transport("agent gone".into()));
        assert_eq!(failed.to_string(), "transport failed: agent gone, reset required");
    }

    #[test]
    fn device_status_does_not_change_state() {
        let (mut session, _) = connected_session();
        let actions = session.handle(TransportEvent::DeviceStatusChanged(DeviceStatus::Detached));
        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Connect,
        Disconnect(bool),
        Reset,
        PeerFound { stale: bool, matching: bool },
        DiscoveryFailed,
        ServiceConnected { stale: bool },
        ServiceFailed,
        Lost { stale: bool },
        TransportFailed,
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => Just(Step::Connect),
            2 => any::<bool>().prop_map(Step::Disconnect),
            1 => Just(Step::Reset),
            3 => (any::<bool>(), any::<bool>())
                .prop_map(|(stale, matching)| Step::PeerFound { stale, matching }),
            1 => Just(Step::DiscoveryFailed),
            3 => any::<bool>().prop_map(|stale| Step::ServiceConnected { stale }),
            1 => Just(Step::ServiceFailed),
            2 => any::<bool>().prop_map(|stale| Step::Lost { stale }),
            1 => Just(Step::TransportFailed),
        ]
    }

    proptest! {
        #[test]
        fn prop_channel_held_iff_connected(steps in prop::collection::vec(step_strategy(), 0..60)) {
            let mut session = Session::new(SessionConfig::default());
            let mut next_channel = 0u64;

            for step in steps {
                let current = session.attempt();
                let stale_attempt = Attempt::new(current.value().wrapping_sub(1));
                let pick = |stale: bool| if stale { stale_attempt } else { current };

                let _ = match step {
                    Step::Connect => session.connect().unwrap_or_default(),
                    Step::Disconnect(silent) => session.disconnect(if silent {
                        DisconnectMode::Silent
                    } else {
                        DisconnectMode::Notify
                    }),
                    Step::Reset => session.reset(),
                    Step::PeerFound { stale, matching } => {
                        let name = if matching { DEFAULT_PROVIDER_APP_NAME } else { "OtherApp" };
                        session.handle(TransportEvent::PeerFound {
                            attempt: pick(stale),
                            peer: Peer::new(name, 512),
                        })
                    },
                    Step::DiscoveryFailed => session.handle(TransportEvent::DiscoveryFailed {
                        attempt: current,
                        reason: "x".into(),
                    }),
                    Step::ServiceConnected { stale } => {
                        next_channel += 1;
                        session.handle(TransportEvent::ServiceConnected {
                            attempt: pick(stale),
                            channel: ChannelHandle::new(next_channel),
                        })
                    },
                    Step::ServiceFailed => session.handle(TransportEvent::ServiceConnectionFailed {
                        attempt: current,
                        reason: "x".into(),
                    }),
                    Step::Lost { stale } => {
                        let channel = match (session.channel(), stale) {
                            (Some(c), false) => c,
                            _ => ChannelHandle::new(u64::MAX),
                        };
                        session.handle(TransportEvent::ChannelLost {
                            channel,
                            reason: LossReason::PeerDisconnected,
                        })
                    },
                    Step::TransportFailed => {
                        session.handle(TransportEvent::TransportFailed { reason: "x".into() })
                    },
                };

                prop_assert_eq!(session.channel().is_some(), session.is_connected());
                let expects_peer = matches!(
                    session.state(),
                    SessionState::AwaitingServiceConnection | SessionState::Connected
                );
                prop_assert_eq!(session.peer().is_some(), expects_peer);
            }
        }
    }
}
