//! Scenario helpers.
//!
//! A [`Scenario`] wires a [`Dispatcher`] to a manual-mode [`SimTransport`]
//! and a [`Recorder`], and provides the transport completions tests need
//! most often with the current attempt filled in.

use gearlink_app::Dispatcher;
use gearlink_core::{
    ChannelHandle, DEFAULT_PROVIDER_APP_NAME, LossReason, Peer, SessionConfig, TransportEvent,
};

use crate::{
    invariants::{InvariantRegistry, LinkSnapshot, Violation},
    recorder::Recorder,
    sim_transport::SimTransport,
};

/// Default peer-advertised maximum payload in scenarios.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// Dispatcher over a simulated transport with recorded listeners.
pub struct Scenario {
    /// System under test
    pub dispatcher: Dispatcher<SimTransport>,
    /// Clone of the transport the dispatcher owns
    pub transport: SimTransport,
    /// Listener logs
    pub recorder: Recorder,
    invariants: InvariantRegistry,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// Initialized dispatcher with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Initialized dispatcher with `config`.
    pub fn with_config(config: SessionConfig) -> Self {
        let transport = SimTransport::new();
        let mut scenario = Self {
            dispatcher: Dispatcher::new(transport.clone(), config),
            transport,
            recorder: Recorder::new(),
            invariants: InvariantRegistry::standard(),
        };
        scenario.reinit();
        scenario
    }

    /// Scenario already connected to the default provider.
    pub fn connected() -> Self {
        let mut scenario = Self::new();
        scenario.connect_to(DEFAULT_PROVIDER_APP_NAME);
        scenario
    }

    /// Register the recorder's listeners again, starting fresh logs.
    pub fn reinit(&mut self) {
        self.recorder.clear();
        self.dispatcher
            .init(self.recorder.message_listener(), self.recorder.connection_listener());
        self.dispatcher.set_notice_listener(self.recorder.notice_listener());
    }

    /// Connect and complete discovery with a peer named `app_name`, then
    /// complete the service connection if the peer matched.
    ///
    /// Returns the channel if the session ended up connected.
    pub fn connect_to(&mut self, app_name: &str) -> Option<ChannelHandle> {
        if let Err(error) = self.dispatcher.connect() {
            tracing::debug!(%error, "scenario connect rejected");
            return None;
        }
        self.peer_found(app_name, DEFAULT_MAX_PAYLOAD);
        if self.dispatcher.session().peer().is_none() {
            return None;
        }
        Some(self.service_connected())
    }

    /// Feed a completion to the dispatcher.
    pub fn inject(&mut self, event: TransportEvent) {
        self.dispatcher.handle_transport_event(event);
    }

    /// Discovery for the current attempt found `app_name`.
    pub fn peer_found(&mut self, app_name: &str, max_data_size: usize) {
        let attempt = self.dispatcher.session().attempt();
        self.inject(TransportEvent::PeerFound { attempt, peer: Peer::new(app_name, max_data_size) });
    }

    /// Service connection for the current attempt succeeded on a new
    /// channel.
    pub fn service_connected(&mut self) -> ChannelHandle {
        let attempt = self.dispatcher.session().attempt();
        let channel = self.transport.issue_channel();
        self.inject(TransportEvent::ServiceConnected { attempt, channel });
        channel
    }

    /// The link drops the current channel. Returns false if none was open.
    pub fn lose_channel(&mut self, reason: LossReason) -> bool {
        let Some(channel) = self.dispatcher.session().channel() else {
            return false;
        };
        match self.transport.drop_channel(channel, reason) {
            Some(event) => {
                self.inject(event);
                true
            },
            None => false,
        }
    }

    /// Host sends `data` on the current channel and configured channel id.
    pub fn receive(&mut self, data: &[u8]) {
        let Some(channel) = self.dispatcher.session().channel() else {
            return;
        };
        let channel_id = self.dispatcher.session().config().channel_id;
        self.inject(TransportEvent::DataReceived { channel, channel_id, data: data.to_vec() });
    }

    /// Observable state right now.
    pub fn snapshot(&self) -> LinkSnapshot {
        let session = self.dispatcher.session();
        LinkSnapshot {
            state: session.state(),
            channel: session.channel(),
            has_peer: session.peer().is_some(),
            open_channels: self.transport.open_channels(),
            connections: self.recorder.connections(),
        }
    }

    /// Check the standard invariants against the current snapshot.
    pub fn check_invariants(&self) -> Result<(), Vec<Violation>> {
        self.invariants.check_all(&self.snapshot())
    }
}
