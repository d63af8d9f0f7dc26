//! GearLink interactive binary.
//!
//! Drives one session against a simulated host over the loopback transport.
//! Commands are read from stdin, one per line; everything the session and the
//! host report is logged.
//!
//! # Usage
//!
//! ```bash
//! # Connect to the default provider and send a rotary event
//! printf 'connect\nrotary cw\nquit\n' | gearlink
//!
//! # Host advertising a different name: discovery reports an unexpected peer
//! gearlink --peer-name OtherApp
//! ```

mod command;

use clap::Parser;
use gearlink_app::{
    DispatchError, Dispatcher, Runtime, RuntimeConfig, RuntimeHandle, TransportEvents,
};
use gearlink_core::{
    DEFAULT_CHANNEL_ID, DEFAULT_PROVIDER_APP_NAME, DisconnectMode, Peer, SessionConfig,
};
use gearlink_harness::SimTransport;
use gearlink_proto::{InputEvent, WireMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::Line;

/// Calls and host inputs kept by the loopback transport.
const HISTORY_LIMIT: usize = 256;

/// GearLink input forwarder
#[derive(Parser, Debug)]
#[command(name = "gearlink")]
#[command(about = "Forward wearable gestures to a loopback host")]
#[command(version)]
struct Args {
    /// Application name the host must advertise
    #[arg(long, default_value = DEFAULT_PROVIDER_APP_NAME)]
    provider: String,

    /// Logical channel id for all messages
    #[arg(long, default_value_t = DEFAULT_CHANNEL_ID)]
    channel_id: u16,

    /// Maximum message size the simulated host accepts
    #[arg(long, default_value_t = 1024)]
    max_payload: usize,

    /// Name the simulated host advertises (defaults to --provider)
    #[arg(long)]
    peer_name: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = SessionConfig { provider_app_name: args.provider, channel_id: args.channel_id };
    let peer_name = args.peer_name.unwrap_or_else(|| config.provider_app_name.clone());

    tracing::info!(
        provider = %config.provider_app_name,
        channel_id = config.channel_id,
        "GearLink starting"
    );
    tracing::info!(peer = %peer_name, max_payload = args.max_payload, "simulated host ready");

    let (events, inbox) = TransportEvents::channel();
    let transport = SimTransport::loopback(events, Some(Peer::new(peer_name, args.max_payload)));
    transport.set_host_channel_id(config.channel_id);
    transport.set_history_limit(HISTORY_LIMIT);

    let dispatcher = Dispatcher::new(transport.clone(), config);
    let (runtime, handle) = Runtime::new(dispatcher, inbox, RuntimeConfig::default());
    let task = tokio::spawn(runtime.run());

    register_listeners(&handle).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(input) = lines.next_line().await? {
        let line = match input.parse::<Line>() {
            Ok(Line::Quit) => break,
            Ok(line) => line,
            Err(error) => {
                tracing::warn!(%error, "ignoring input");
                continue;
            },
        };

        if let Err(error) = execute(&handle, line).await {
            tracing::warn!(%error, "command failed");
        }
    }

    handle.shutdown().await?;
    task.await?;

    tracing::info!(received = transport.host_input_count(), "GearLink stopped");
    Ok(())
}

async fn register_listeners(handle: &RuntimeHandle) -> Result<(), DispatchError> {
    handle
        .init(
            |message: WireMessage| tracing::info!(kind = message.type_name(), ?message, "message"),
            |connected: bool| tracing::info!(connected, "connection changed"),
        )
        .await
}

async fn execute(handle: &RuntimeHandle, line: Line) -> Result<(), DispatchError> {
    match line {
        Line::Empty | Line::Quit => Ok(()),
        Line::Init => register_listeners(handle).await,
        Line::Connect => handle.connect().await,
        Line::Disconnect => handle.disconnect(DisconnectMode::Notify).await,
        Line::Destroy => handle.destroy().await,
        Line::Reset => handle.reset().await,
        Line::TouchStart(x, y) => handle.send(InputEvent::TouchStart { x, y }).await,
        Line::TouchMove(x, y) => handle.send(InputEvent::TouchMove { x, y }).await,
        Line::TouchEnd => handle.send(InputEvent::TouchEnd).await,
        Line::Click(x, y) => handle.send(InputEvent::Click { x, y }).await,
        Line::Rotary(direction) => handle.rotary(&direction).await,
        Line::Swipe(direction) => handle.swipe(&direction).await,
        Line::Back => handle.send(InputEvent::Back).await,
    }
}
