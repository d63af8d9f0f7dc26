//! Runtime tests over the loopback transport.
//!
//! Completions are posted by the simulated host while the runtime task runs.
//! The runtime drains completions before each command, so the next command
//! always observes every completion posted before it was issued.

use gearlink_app::{
    DispatchError, Dispatcher, Runtime, RuntimeConfig, RuntimeHandle, TransportEvents,
};
use gearlink_core::{
    DEFAULT_PROVIDER_APP_NAME, DisconnectMode, LossReason, Peer, SessionConfig, SessionState,
};
use gearlink_harness::{Recorder, SimTransport};
use gearlink_proto::{InputEvent, RotaryDirection, SwipeDirection, decode};
use tokio::task::JoinHandle;

struct Loopback {
    handle: RuntimeHandle,
    host: SimTransport,
    recorder: Recorder,
    task: JoinHandle<Dispatcher<SimTransport>>,
}

async fn start(peer: Option<Peer>) -> Loopback {
    let (events, inbox) = TransportEvents::channel();
    let host = SimTransport::loopback(events, peer);
    let dispatcher = Dispatcher::new(host.clone(), SessionConfig::default());
    let (runtime, handle) = Runtime::new(dispatcher, inbox, RuntimeConfig::default());
    let task = tokio::spawn(runtime.run());

    let recorder = Recorder::new();
    handle.init(recorder.message_listener(), recorder.connection_listener()).await.unwrap();

    Loopback { handle, host, recorder, task }
}

fn provider() -> Option<Peer> {
    Some(Peer::new(DEFAULT_PROVIDER_APP_NAME, 1024))
}

#[tokio::test]
async fn gestures_reach_the_host() {
    let link = start(provider()).await;

    link.handle.connect().await.unwrap();
    link.handle.rotary("cw").await.unwrap();
    link.handle.send(InputEvent::Click { x: 10, y: 20 }).await.unwrap();
    link.handle.swipe("DOWN").await.unwrap();
    link.handle.shutdown().await.unwrap();

    let dispatcher = link.task.await.unwrap();
    assert_eq!(dispatcher.state(), SessionState::Idle);
    assert_eq!(link.host.host_inputs(), vec![
        InputEvent::Rotary(RotaryDirection::Cw),
        InputEvent::Click { x: 10, y: 20 },
        InputEvent::Swipe(SwipeDirection::Down),
    ]);
    assert_eq!(link.recorder.connections(), vec![true]);
    assert!(link.host.open_channels().is_empty());
}

#[tokio::test]
async fn missing_provider_fails_attempt() {
    let link = start(None).await;

    link.handle.connect().await.unwrap();
    assert_eq!(link.handle.send(InputEvent::Back).await, Err(DispatchError::NotConnected));
    assert_eq!(link.recorder.connections(), vec![false]);

    // The attempt is over, so connecting again is accepted
    link.handle.connect().await.unwrap();
    link.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn refused_connection_returns_to_idle() {
    let link = start(provider()).await;
    link.host.set_refuse_connection(true);

    link.handle.connect().await.unwrap();
    assert_eq!(link.handle.send(InputEvent::Back).await, Err(DispatchError::NotConnected));
    assert_eq!(link.recorder.connections(), vec![false]);
    link.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn channel_loss_is_reported() {
    let link = start(provider()).await;
    link.handle.connect().await.unwrap();
    link.handle.send(InputEvent::TouchEnd).await.unwrap();

    let channel = link.host.open_channels()[0];
    assert!(link.host.drop_channel(channel, LossReason::PeerDisconnected).is_some());

    assert_eq!(link.handle.send(InputEvent::Back).await, Err(DispatchError::NotConnected));
    assert_eq!(link.recorder.connections(), vec![true, false]);
    link.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn host_messages_reach_listener() {
    let link = start(provider()).await;
    link.handle.connect().await.unwrap();
    link.handle.send(InputEvent::TouchEnd).await.unwrap();

    let status = decode(br#"{"type":"CONNECTION_STATUS","connected":true}"#).unwrap();
    assert_eq!(link.host.push_from_host(&status), 1);

    link.handle.disconnect(DisconnectMode::Silent).await.unwrap();
    assert_eq!(link.recorder.messages(), vec![status]);
    link.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn dropped_handles_stop_the_runtime() {
    let link = start(provider()).await;
    link.handle.connect().await.unwrap();

    drop(link.handle);
    let dispatcher = link.task.await.unwrap();

    assert!(!dispatcher.is_initialized());
    assert!(link.host.open_channels().is_empty());
}
