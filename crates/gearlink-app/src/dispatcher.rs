//! Event dispatcher.
//!
//! Owns the [`Session`] and the [`Transport`] and executes the actions the
//! session returns. UI gestures become outbound messages; inbound data
//! becomes listener callbacks.
//!
//! # Flow
//!
//! ```text
//! UI ──send_*──> Dispatcher ──encode_bounded──> Transport::send ──> peer
//! peer ──> TransportEvent ──> Session::handle ──Deliver──> decode ──> MessageListener
//! ```

use std::collections::VecDeque;

use gearlink_core::{
    DisconnectMode, Notice, Session, SessionAction, SessionConfig, SessionState, Transport,
    TransportEvent,
};
use gearlink_proto::{InputEvent, WireMessage, decode, encode_bounded};

use crate::{
    error::DispatchError,
    listener::{ConnectionListener, MessageListener, NoticeListener},
};

/// Callbacks registered by `init`.
struct Listeners {
    on_message: Box<dyn MessageListener>,
    on_connection: Box<dyn ConnectionListener>,
}

/// UI-facing entry point for one wearable-to-host link.
///
/// Every operation other than [`Dispatcher::handle_transport_event`] and
/// [`Dispatcher::destroy`] requires [`Dispatcher::init`] first.
pub struct Dispatcher<T: Transport> {
    transport: T,
    session: Session,
    listeners: Option<Listeners>,
    notices: Option<Box<dyn NoticeListener>>,
}

impl<T: Transport> Dispatcher<T> {
    /// Create an uninitialized dispatcher over `transport`.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self { transport, session: Session::new(config), listeners: None, notices: None }
    }

    /// Register the message and connection listeners.
    ///
    /// Calling again replaces both.
    pub fn init(
        &mut self,
        on_message: impl MessageListener + 'static,
        on_connection: impl ConnectionListener + 'static,
    ) {
        self.init_boxed(Box::new(on_message), Box::new(on_connection));
    }

    pub(crate) fn init_boxed(
        &mut self,
        on_message: Box<dyn MessageListener>,
        on_connection: Box<dyn ConnectionListener>,
    ) {
        if self.listeners.is_some() {
            tracing::debug!("replacing listeners");
        }
        self.listeners = Some(Listeners { on_message, on_connection });
    }

    /// Register the listener for transient notices. Replaces any previous one.
    pub fn set_notice_listener(&mut self, listener: impl NoticeListener + 'static) {
        self.notices = Some(Box::new(listener));
    }

    /// True between `init` and `destroy`.
    pub fn is_initialized(&self) -> bool {
        self.listeners.is_some()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// The session this dispatcher drives.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Start connecting to the host peer.
    ///
    /// Returns once discovery has been requested; the outcome arrives through
    /// the connection listener.
    ///
    /// # Errors
    ///
    /// - `DispatchError::NotInitialized` before `init`
    /// - `DispatchError::Session` if already connected or connecting, or
    ///   after a transport failure that has not been reset
    pub fn connect(&mut self) -> Result<(), DispatchError> {
        self.ensure_initialized()?;
        let actions = self.session.connect().inspect_err(|error| {
            tracing::warn!(%error, "connect rejected");
        })?;
        self.execute(actions);
        Ok(())
    }

    /// Close the channel or cancel the attempt in progress.
    ///
    /// Disconnecting while already disconnected is a no-op.
    ///
    /// # Errors
    ///
    /// - `DispatchError::NotInitialized` before `init`
    pub fn disconnect(&mut self, mode: DisconnectMode) -> Result<(), DispatchError> {
        self.ensure_initialized()?;
        let actions = self.session.disconnect(mode);
        self.execute(actions);
        Ok(())
    }

    /// Clear a transport failure so `connect` is accepted again.
    ///
    /// # Errors
    ///
    /// - `DispatchError::NotInitialized` before `init`
    pub fn reset(&mut self) -> Result<(), DispatchError> {
        self.ensure_initialized()?;
        let actions = self.session.reset();
        self.execute(actions);
        Ok(())
    }

    /// Silently tear down the session and release all listeners.
    ///
    /// The dispatcher must be initialized again before further use.
    pub fn destroy(&mut self) {
        let actions = self.session.destroy();
        self.listeners = None;
        self.notices = None;
        self.execute(actions);
        tracing::debug!("dispatcher destroyed");
    }

    /// Feed a completion posted by the transport.
    ///
    /// Accepted in any state, including after `destroy`, so late completions
    /// can still release what they hold.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        let actions = self.session.handle(event);
        self.execute(actions);
    }

    /// Send one input event to the host.
    ///
    /// Never queued: if no channel is open the event is dropped.
    ///
    /// # Errors
    ///
    /// - `DispatchError::NotInitialized` before `init`
    /// - `DispatchError::NotConnected` if no channel is open
    /// - `DispatchError::Protocol` if the encoded message exceeds the peer
    ///   maximum
    /// - `DispatchError::SendFailed` if the transport rejected the message
    pub fn send(&mut self, event: InputEvent) -> Result<(), DispatchError> {
        self.ensure_initialized()?;

        let kind = event.kind().as_str();
        let (Some(channel), Some(max)) = (self.session.channel(), self.session.max_payload())
        else {
            tracing::warn!(kind, "cannot send, not connected");
            return Err(DispatchError::NotConnected);
        };

        let bytes = encode_bounded(&WireMessage::Input(event), max).inspect_err(|error| {
            tracing::warn!(kind, %error, "cannot send, encoding rejected");
        })?;

        self.transport.send(channel, self.session.config().channel_id, &bytes).inspect_err(
            |error| {
                tracing::warn!(kind, %error, "send failed");
            },
        )?;

        tracing::trace!(kind, size = bytes.len(), "sent input");
        Ok(())
    }

    /// Send `TOUCH_START` at (x, y).
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send`].
    pub fn send_touch_start(&mut self, x: i32, y: i32) -> Result<(), DispatchError> {
        self.send(InputEvent::TouchStart { x, y })
    }

    /// Send `TOUCH_MOVE` to (x, y).
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send`].
    pub fn send_touch_move(&mut self, x: i32, y: i32) -> Result<(), DispatchError> {
        self.send(InputEvent::TouchMove { x, y })
    }

    /// Send `TOUCH_END`.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send`].
    pub fn send_touch_end(&mut self) -> Result<(), DispatchError> {
        self.send(InputEvent::TouchEnd)
    }

    /// Send `CLICK` at (x, y).
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send`].
    pub fn send_click(&mut self, x: i32, y: i32) -> Result<(), DispatchError> {
        self.send(InputEvent::Click { x, y })
    }

    /// Send `ROTARY` in a device direction string.
    ///
    /// # Errors
    ///
    /// - `DispatchError::NotInitialized` before `init`
    /// - `DispatchError::Protocol` if `direction` is not CW or CCW; nothing
    ///   is sent
    /// - otherwise see [`Dispatcher::send`]
    pub fn send_rotary(&mut self, direction: &str) -> Result<(), DispatchError> {
        self.ensure_initialized()?;
        let event = InputEvent::rotary(direction).inspect_err(|error| {
            tracing::warn!(%error, "rotary event rejected");
        })?;
        self.send(event)
    }

    /// Send `SWIPE` in a device direction string.
    ///
    /// # Errors
    ///
    /// - `DispatchError::NotInitialized` before `init`
    /// - `DispatchError::Protocol` if `direction` is not UP, DOWN, LEFT or
    ///   RIGHT; nothing is sent
    /// - otherwise see [`Dispatcher::send`]
    pub fn send_swipe(&mut self, direction: &str) -> Result<(), DispatchError> {
        self.ensure_initialized()?;
        let event = InputEvent::swipe(direction).inspect_err(|error| {
            tracing::warn!(%error, "swipe event rejected");
        })?;
        self.send(event)
    }

    /// Send `BACK`.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send`].
    pub fn send_back(&mut self) -> Result<(), DispatchError> {
        self.send(InputEvent::Back)
    }

    fn ensure_initialized(&self) -> Result<(), DispatchError> {
        if self.is_initialized() { Ok(()) } else { Err(DispatchError::NotInitialized) }
    }

    /// Execute session actions in order.
    ///
    /// A discover or connection request that cannot be issued is fed back to
    /// the session as the matching failure completion; the resulting actions
    /// run after the current ones.
    fn execute(&mut self, actions: Vec<SessionAction>) {
        let mut pending: VecDeque<SessionAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                SessionAction::DiscoverPeers { attempt } => {
                    if let Err(error) = self.transport.discover_peers(attempt) {
                        tracing::warn!(%attempt, %error, "discovery request failed");
                        pending.extend(self.session.handle(TransportEvent::DiscoveryFailed {
                            attempt,
                            reason: error.to_string(),
                        }));
                    }
                },
                SessionAction::RequestServiceConnection { attempt, peer } => {
                    if let Err(error) = self.transport.request_connection(attempt, &peer) {
                        tracing::warn!(%attempt, %error, "service connection request failed");
                        pending.extend(self.session.handle(
                            TransportEvent::ServiceConnectionFailed {
                                attempt,
                                reason: error.to_string(),
                            },
                        ));
                    }
                },
                SessionAction::CloseChannel(channel) => {
                    if let Err(error) = self.transport.close(channel) {
                        tracing::debug!(%channel, %error, "close failed, treating as closed");
                    }
                },
                SessionAction::ConnectionChanged { connected } => {
                    if let Some(listeners) = self.listeners.as_mut() {
                        listeners.on_connection.on_connection_changed(connected);
                    }
                },
                SessionAction::Notify(notice) => self.notify(&notice),
                SessionAction::Deliver(data) => self.deliver(&data),
            }
        }
    }

    fn notify(&mut self, notice: &Notice) {
        tracing::info!(%notice, "notice");
        if let Some(listener) = self.notices.as_mut() {
            listener.on_notice(notice);
        }
    }

    fn deliver(&mut self, data: &[u8]) {
        let message = match decode(data) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, size = data.len(), "dropping inbound message");
                return;
            },
        };

        if message.message_type().is_none() {
            tracing::info!(kind = message.type_name(), "accepted message of unknown type");
            return;
        }

        match self.listeners.as_mut() {
            Some(listeners) => listeners.on_message.on_message(message),
            None => tracing::debug!(kind = message.type_name(), "no message listener"),
        }
    }
}
