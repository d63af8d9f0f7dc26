//! Simulated accessory link.
//!
//! `SimTransport` records every request and tracks which channels it has
//! issued. Clones share state, so a test can keep one clone for inspection
//! while the dispatcher owns another.
//!
//! Two modes:
//! - manual (`new`): requests are only recorded; the test injects
//!   completions itself
//! - loopback (`loopback`): a simulated host answers every request by
//!   posting completions to a [`TransportEvents`] sink and decodes what it
//!   receives with an [`InputReceiver`]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gearlink_app::{InputReceiver, TransportEvents};
use gearlink_core::{
    Attempt, ChannelHandle, DEFAULT_CHANNEL_ID, LossReason, Peer, Transport, TransportError,
    TransportEvent,
};
use gearlink_proto::{InputEvent, WireMessage, encode};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `discover_peers`
    Discover(Attempt),
    /// `request_connection`
    RequestConnection {
        /// Attempt the request belongs to
        attempt: Attempt,
        /// Peer application name
        peer: String,
    },
    /// `send`, whether or not it succeeded
    Send {
        /// Target channel
        channel: ChannelHandle,
        /// Logical channel id
        channel_id: u16,
        /// Payload
        data: Vec<u8>,
    },
    /// `close`
    Close(ChannelHandle),
}

/// Simulated host answering requests in loopback mode.
struct Host {
    events: TransportEvents,
    peer: Option<Peer>,
    refuse_connection: bool,
    receiver: InputReceiver,
    received: Vec<InputEvent>,
    received_total: usize,
}

#[derive(Default)]
struct SharedState {
    calls: Vec<Call>,
    open: Vec<ChannelHandle>,
    next_channel: u64,
    fail_requests: bool,
    fail_send: bool,
    history_limit: Option<usize>,
    host: Option<Host>,
}

impl SharedState {
    fn issue_channel(&mut self) -> ChannelHandle {
        self.next_channel += 1;
        let channel = ChannelHandle::new(self.next_channel);
        self.open.push(channel);
        channel
    }

    fn record(&mut self, call: Call) {
        self.calls.push(call);
        trim(&mut self.calls, self.history_limit);
    }

    fn is_open(&self, channel: ChannelHandle) -> bool {
        self.open.contains(&channel)
    }

    fn remove(&mut self, channel: ChannelHandle) {
        self.open.retain(|open| *open != channel);
    }
}

/// Drop the oldest entries beyond `limit`.
fn trim<T>(log: &mut Vec<T>, limit: Option<usize>) {
    if let Some(limit) = limit {
        let excess = log.len().saturating_sub(limit);
        log.drain(..excess);
    }
}

/// In-memory [`Transport`] for tests and the loopback binary.
#[derive(Clone, Default)]
pub struct SimTransport {
    state: Arc<Mutex<SharedState>>,
}

impl SimTransport {
    /// Manual-mode transport: records requests, posts nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loopback transport whose host advertises `peer`.
    ///
    /// `None` makes every discovery fail.
    pub fn loopback(events: TransportEvents, peer: Option<Peer>) -> Self {
        let transport = Self::new();
        transport.lock().host = Some(Host {
            events,
            peer,
            refuse_connection: false,
            receiver: InputReceiver::new(DEFAULT_CHANNEL_ID),
            received: Vec::new(),
            received_total: 0,
        });
        transport
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a new open channel, as the link does on a successful service
    /// connection.
    pub fn issue_channel(&self) -> ChannelHandle {
        self.lock().issue_channel()
    }

    /// Make `discover_peers` and `request_connection` fail immediately.
    pub fn set_fail_requests(&self, fail: bool) {
        self.lock().fail_requests = fail;
    }

    /// Make `send` fail immediately.
    pub fn set_fail_send(&self, fail: bool) {
        self.lock().fail_send = fail;
    }

    /// Logical channel id the loopback host listens on.
    pub fn set_host_channel_id(&self, channel_id: u16) {
        if let Some(host) = self.lock().host.as_mut() {
            host.receiver = InputReceiver::new(channel_id);
        }
    }

    /// Loopback host answers service-connection requests with an error.
    pub fn set_refuse_connection(&self, refuse: bool) {
        if let Some(host) = self.lock().host.as_mut() {
            host.refuse_connection = refuse;
        }
    }

    /// Keep only the newest `limit` calls and host inputs.
    ///
    /// Unbounded by default. Long-running loopback sessions should set one.
    pub fn set_history_limit(&self, limit: usize) {
        let mut state = self.lock();
        state.history_limit = Some(limit);
        trim(&mut state.calls, Some(limit));
        if let Some(host) = state.host.as_mut() {
            trim(&mut host.received, Some(limit));
        }
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Payloads of every `send` call.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Send { data, .. } => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `send` calls, successful or not.
    pub fn send_count(&self) -> usize {
        self.lock().calls.iter().filter(|call| matches!(call, Call::Send { .. })).count()
    }

    /// Channels passed to `close`.
    pub fn closed(&self) -> Vec<ChannelHandle> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Close(channel) => Some(*channel),
                _ => None,
            })
            .collect()
    }

    /// Channels issued and not yet closed or lost.
    pub fn open_channels(&self) -> Vec<ChannelHandle> {
        self.lock().open.clone()
    }

    /// Input events the loopback host has decoded, within the history limit.
    pub fn host_inputs(&self) -> Vec<InputEvent> {
        self.lock().host.as_ref().map(|host| host.received.clone()).unwrap_or_default()
    }

    /// Number of input events the loopback host has decoded in total.
    pub fn host_input_count(&self) -> usize {
        self.lock().host.as_ref().map_or(0, |host| host.received_total)
    }

    /// Simulate the link dropping an open channel.
    ///
    /// Returns the completion to deliver; in loopback mode it is also
    /// posted. `None` if `channel` is not open.
    pub fn drop_channel(
        &self,
        channel: ChannelHandle,
        reason: LossReason,
    ) -> Option<TransportEvent> {
        let mut state = self.lock();
        if !state.is_open(channel) {
            return None;
        }
        state.remove(channel);

        let event = TransportEvent::ChannelLost { channel, reason };
        if let Some(host) = state.host.as_ref() {
            host.events.post(event.clone());
        }
        Some(event)
    }

    /// Loopback host sends `message` on every open channel.
    ///
    /// Returns the number of channels it was posted on.
    pub fn push_from_host(&self, message: &WireMessage) -> usize {
        let state = self.lock();
        let Some(host) = state.host.as_ref() else {
            return 0;
        };
        let data = match encode(message) {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(%error, "host message not encodable");
                return 0;
            },
        };

        for channel in &state.open {
            host.events.post(TransportEvent::DataReceived {
                channel: *channel,
                channel_id: host.receiver.channel_id(),
                data: data.clone(),
            });
        }
        state.open.len()
    }
}

impl Transport for SimTransport {
    fn discover_peers(&mut self, attempt: Attempt) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.record(Call::Discover(attempt));
        if state.fail_requests {
            return Err(TransportError::Request("discovery unavailable".into()));
        }

        if let Some(host) = state.host.as_ref() {
            let event = match host.peer.clone() {
                Some(peer) => TransportEvent::PeerFound { attempt, peer },
                None => TransportEvent::DiscoveryFailed { attempt, reason: "no peer".into() },
            };
            host.events.post(event);
        }
        Ok(())
    }

    fn request_connection(&mut self, attempt: Attempt, peer: &Peer) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.record(Call::RequestConnection { attempt, peer: peer.app_name.clone() });
        if state.fail_requests {
            return Err(TransportError::Request("service connection unavailable".into()));
        }

        let refuse = match state.host.as_ref() {
            Some(host) => host.refuse_connection,
            None => return Ok(()),
        };
        let event = if refuse {
            TransportEvent::ServiceConnectionFailed { attempt, reason: "refused by host".into() }
        } else {
            TransportEvent::ServiceConnected { attempt, channel: state.issue_channel() }
        };
        if let Some(host) = state.host.as_ref() {
            host.events.post(event);
        }
        Ok(())
    }

    fn send(
        &mut self,
        channel: ChannelHandle,
        channel_id: u16,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.record(Call::Send { channel, channel_id, data: data.to_vec() });

        if state.fail_send {
            return Err(TransportError::ChannelUnavailable("send rejected".into()));
        }
        if !state.is_open(channel) {
            return Err(TransportError::ChannelUnavailable(format!("{channel} is closed")));
        }

        let limit = state.history_limit;
        if let Some(host) = state.host.as_mut() {
            match host.receiver.receive(channel_id, data) {
                Ok(Some(event)) => {
                    tracing::info!(kind = event.kind().as_str(), ?event, "host received input");
                    host.received.push(event);
                    host.received_total += 1;
                    trim(&mut host.received, limit);
                },
                Ok(None) => {},
                Err(error) => tracing::warn!(%error, "host dropped message"),
            }
        }
        Ok(())
    }

    fn close(&mut self, channel: ChannelHandle) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.record(Call::Close(channel));
        state.remove(channel);
        Ok(())
    }
}
