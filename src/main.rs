//! Demo driver for the courier client.
//!
//! With a config file it connects to the configured broker over TCP; without
//! one it runs against the in-process loopback transport, where published
//! messages echo straight back as inbound events.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use mqtt_courier::{logging, ClientEvent, CourierClient, CourierConfig, CourierResult, QoS};
use tokio::signal;
use tracing::{error, info};

/// Client-side pub/sub runtime demo
#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Connect, subscribe and publish with the courier client")]
#[command(version)]
struct Cli {
    /// Configuration file path; omit to run against the loopback transport
    #[arg(short, long, value_name = "FILE", env = "COURIER_CONFIG")]
    config: Option<PathBuf>,

    /// Topic filter to subscribe to after connecting
    #[arg(long, default_value = "demo/#")]
    subscribe: String,

    /// Topic for the greeting publish
    #[arg(long, default_value = "demo/hello")]
    topic: String,
}

#[tokio::main]
async fn main() {
    logging::init_default_logging();
    let cli = Cli::parse();

    info!("starting courier v{}", env!("CARGO_PKG_VERSION"));

    let mut client = match build_client(&cli) {
        Ok(client) => client,
        Err(e) => {
            error!("failed to build client: {e}");
            process::exit(1);
        }
    };

    let accepted = if cli.config.is_some() {
        client.connect_configured()
    } else {
        client.connect("loopback", 0, false)
    };
    if !accepted {
        error!("connection request refused");
        process::exit(1);
    }

    client.subscribe(&cli.subscribe, QoS::AtMostOnce);
    client.publish(
        &cli.topic,
        Bytes::from_static(b"hello from courier"),
        QoS::AtMostOnce,
        false,
    );

    info!("running; ctrl-c to exit");
    loop {
        tokio::select! {
            event = client.next_event() => match event {
                Some(ClientEvent::Connected) => info!("connected"),
                Some(ClientEvent::ConnectFailed { reason }) => {
                    error!(%reason, "connection failed");
                    break;
                }
                Some(ClientEvent::Disconnected { reason }) => {
                    info!(%reason, "disconnected");
                    break;
                }
                Some(ClientEvent::Message { topic, payload }) => {
                    info!(%topic, payload = %String::from_utf8_lossy(&payload), "message received");
                }
                None => break,
            },
            _ = signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }

    client.disconnect(false);
    // Give the worker a moment to confirm the teardown before stopping it.
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(1), client.next_event()).await
    {
        if let ClientEvent::Disconnected { reason } = event {
            info!(%reason, "teardown confirmed");
            break;
        }
    }

    client.shutdown().await;
    info!("shutdown complete");
}

fn build_client(cli: &Cli) -> CourierResult<CourierClient> {
    match &cli.config {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            let config = CourierConfig::load_from_file(path)?;
            CourierClient::from_config(&config)
        }
        None => Ok(CourierClient::new()),
    }
}
