//! Recording listeners.
//!
//! A [`Recorder`] hands out listener closures that append to shared logs,
//! so tests can assert on exactly what the UI was told and in what order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gearlink_app::{ConnectionListener, MessageListener, NoticeListener};
use gearlink_core::Notice;
use gearlink_proto::WireMessage;

#[derive(Debug, Default)]
struct Logs {
    messages: Vec<WireMessage>,
    connections: Vec<bool>,
    notices: Vec<Notice>,
}

/// Shared log of listener invocations. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    logs: Arc<Mutex<Logs>>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Logs> {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Listener recording every delivered message.
    pub fn message_listener(&self) -> impl MessageListener + 'static {
        let recorder = self.clone();
        move |message: WireMessage| recorder.lock().messages.push(message)
    }

    /// Listener recording every connection change.
    pub fn connection_listener(&self) -> impl ConnectionListener + 'static {
        let recorder = self.clone();
        move |connected: bool| recorder.lock().connections.push(connected)
    }

    /// Listener recording every notice.
    pub fn notice_listener(&self) -> impl NoticeListener + 'static {
        let recorder = self.clone();
        move |notice: &Notice| recorder.lock().notices.push(notice.clone())
    }

    /// Messages delivered so far.
    pub fn messages(&self) -> Vec<WireMessage> {
        self.lock().messages.clone()
    }

    /// Connection changes so far.
    pub fn connections(&self) -> Vec<bool> {
        self.lock().connections.clone()
    }

    /// Notices raised so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.lock().notices.clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        let mut logs = self.lock();
        logs.messages.clear();
        logs.connections.clear();
        logs.notices.clear();
    }
}
