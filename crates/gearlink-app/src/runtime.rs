//! Async runtime for the dispatcher.
//!
//! A single task owns the [`Dispatcher`] and drains two channels with
//! `tokio::select!`: UI commands from any number of [`RuntimeHandle`]s and
//! completions posted through [`TransportEvents`]. Exactly one transition is
//! evaluated at a time, so completions arriving from transport threads never
//! race a UI operation.

use std::fmt;

use gearlink_core::{DisconnectMode, Transport, TransportEvent};
use gearlink_proto::InputEvent;
use tokio::sync::{mpsc, oneshot};

use crate::{
    dispatcher::Dispatcher,
    error::DispatchError,
    listener::{ConnectionListener, MessageListener},
};

/// Runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Commands buffered before `RuntimeHandle` calls wait
    pub command_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { command_capacity: 64 }
    }
}

/// UI operation executed on the runtime task.
pub enum Command {
    /// Register listeners, as [`Dispatcher::init`]
    Init {
        /// Message listener
        on_message: Box<dyn MessageListener>,
        /// Connection listener
        on_connection: Box<dyn ConnectionListener>,
    },
    /// [`Dispatcher::connect`]
    Connect,
    /// [`Dispatcher::disconnect`]
    Disconnect(DisconnectMode),
    /// [`Dispatcher::destroy`]
    Destroy,
    /// [`Dispatcher::reset`]
    Reset,
    /// [`Dispatcher::send`]
    Send(InputEvent),
    /// [`Dispatcher::send_rotary`]
    Rotary(String),
    /// [`Dispatcher::send_swipe`]
    Swipe(String),
    /// Destroy the dispatcher and stop the task
    Shutdown,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init { .. } => f.write_str("Init"),
            Self::Connect => f.write_str("Connect"),
            Self::Disconnect(mode) => f.debug_tuple("Disconnect").field(mode).finish(),
            Self::Destroy => f.write_str("Destroy"),
            Self::Reset => f.write_str("Reset"),
            Self::Send(event) => f.debug_tuple("Send").field(event).finish(),
            Self::Rotary(direction) => f.debug_tuple("Rotary").field(direction).finish(),
            Self::Swipe(direction) => f.debug_tuple("Swipe").field(direction).finish(),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

struct Request {
    command: Command,
    reply: oneshot::Sender<Result<(), DispatchError>>,
}

/// Sender a transport uses to post completions to the runtime.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportEvents {
    /// Create a sender and the receiving end for [`Runtime::new`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Post a completion. Never blocks.
    ///
    /// Returns false if the runtime has stopped; the event is dropped.
    pub fn post(&self, event: TransportEvent) -> bool {
        if self.tx.send(event).is_err() {
            tracing::debug!("runtime stopped, dropping transport event");
            return false;
        }
        true
    }
}

/// Cloneable UI-side handle to a running [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    tx: mpsc::Sender<Request>,
}

impl RuntimeHandle {
    /// Execute a command on the runtime task and wait for its result.
    ///
    /// # Errors
    ///
    /// - `DispatchError::RuntimeStopped` if the task has exited
    /// - otherwise the error the dispatcher returned
    pub async fn execute(&self, command: Command) -> Result<(), DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { command, reply })
            .await
            .map_err(|_| DispatchError::RuntimeStopped)?;
        rx.await.map_err(|_| DispatchError::RuntimeStopped)?
    }

    /// Register listeners.
    ///
    /// # Errors
    ///
    /// - `DispatchError::RuntimeStopped` if the task has exited
    pub async fn init(
        &self,
        on_message: impl MessageListener + 'static,
        on_connection: impl ConnectionListener + 'static,
    ) -> Result<(), DispatchError> {
        self.execute(Command::Init {
            on_message: Box::new(on_message),
            on_connection: Box::new(on_connection),
        })
        .await
    }

    /// Start connecting.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::connect`].
    pub async fn connect(&self) -> Result<(), DispatchError> {
        self.execute(Command::Connect).await
    }

    /// Disconnect.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::disconnect`].
    pub async fn disconnect(&self, mode: DisconnectMode) -> Result<(), DispatchError> {
        self.execute(Command::Disconnect(mode)).await
    }

    /// Tear down silently and release listeners.
    ///
    /// # Errors
    ///
    /// - `DispatchError::RuntimeStopped` if the task has exited
    pub async fn destroy(&self) -> Result<(), DispatchError> {
        self.execute(Command::Destroy).await
    }

    /// Clear a transport failure.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::reset`].
    pub async fn reset(&self) -> Result<(), DispatchError> {
        self.execute(Command::Reset).await
    }

    /// Send one input event.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send`].
    pub async fn send(&self, event: InputEvent) -> Result<(), DispatchError> {
        self.execute(Command::Send(event)).await
    }

    /// Send a rotary event from a direction string.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send_rotary`].
    pub async fn rotary(&self, direction: &str) -> Result<(), DispatchError> {
        self.execute(Command::Rotary(direction.to_string())).await
    }

    /// Send a swipe event from a direction string.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::send_swipe`].
    pub async fn swipe(&self, direction: &str) -> Result<(), DispatchError> {
        self.execute(Command::Swipe(direction.to_string())).await
    }

    /// Destroy the dispatcher and stop the runtime task.
    ///
    /// # Errors
    ///
    /// - `DispatchError::RuntimeStopped` if the task had already exited
    pub async fn shutdown(&self) -> Result<(), DispatchError> {
        self.execute(Command::Shutdown).await
    }
}

/// Single-task owner of a [`Dispatcher`].
pub struct Runtime<T: Transport> {
    dispatcher: Dispatcher<T>,
    commands: mpsc::Receiver<Request>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl<T: Transport> Runtime<T> {
    /// Create a runtime around `dispatcher`, fed by `events` from
    /// [`TransportEvents::channel`].
    pub fn new(
        dispatcher: Dispatcher<T>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        config: RuntimeConfig,
    ) -> (Self, RuntimeHandle) {
        let (tx, commands) = mpsc::channel(config.command_capacity.max(1));
        (Self { dispatcher, commands, events }, RuntimeHandle { tx })
    }

    /// Run until shutdown or until every handle is dropped.
    ///
    /// Returns the dispatcher, destroyed, so callers can inspect the
    /// transport.
    pub async fn run(mut self) -> Dispatcher<T> {
        let mut events_open = true;

        loop {
            tokio::select! {
                // Completions first so a command sees every earlier completion
                biased;

                event = self.events.recv(), if events_open => {
                    match event {
                        Some(event) => self.dispatcher.handle_transport_event(event),
                        None => {
                            tracing::debug!("transport event channel closed");
                            events_open = false;
                        },
                    }
                }

                request = self.commands.recv() => {
                    let Some(Request { command, reply }) = request else {
                        tracing::debug!("all runtime handles dropped");
                        break;
                    };

                    if matches!(command, Command::Shutdown) {
                        let _ = reply.send(Ok(()));
                        break;
                    }

                    let result = self.apply(command);
                    // Caller may have stopped waiting
                    let _ = reply.send(result);
                }
            }
        }

        self.dispatcher.destroy();
        tracing::info!("runtime stopped");
        self.dispatcher
    }

    fn apply(&mut self, command: Command) -> Result<(), DispatchError> {
        tracing::trace!(?command, "command");
        match command {
            Command::Init { on_message, on_connection } => {
                self.dispatcher.init_boxed(on_message, on_connection);
                Ok(())
            },
            Command::Connect => self.dispatcher.connect(),
            Command::Disconnect(mode) => self.dispatcher.disconnect(mode),
            Command::Destroy => {
                self.dispatcher.destroy();
                Ok(())
            },
            Command::Reset => self.dispatcher.reset(),
            Command::Send(event) => self.dispatcher.send(event),
            Command::Rotary(direction) => self.dispatcher.send_rotary(&direction),
            Command::Swipe(direction) => self.dispatcher.send_swipe(&direction),
            Command::Shutdown => Ok(()),
        }
    }
}
