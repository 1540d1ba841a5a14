//! mqtt-courier - client-side pub/sub runtime
//!
//! A client runtime for an MQTT-shaped publish/subscribe protocol. An
//! owner-facing handle issues connect/disconnect/publish/subscribe requests
//! without ever blocking; a dedicated background worker owns the connection
//! state machine, drains the command queues, and drives the wire through two
//! narrow, swappable collaborators:
//!
//! - [`Transport`](transport::Transport) - a byte-stream connection
//!   (TCP, an in-process loopback, or anything else)
//! - [`PacketCodec`](codec::PacketCodec) - frame encoding/decoding
//!
//! Worker results come back as an ordered [`ClientEvent`] stream; the worker
//! never touches owner-owned state.
//!
//! # Quick Start
//!
//! ```no_run
//! use mqtt_courier::{ClientEvent, CourierClient, QoS};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // The default client runs against the in-process loopback transport:
//! // published messages echo back as inbound events.
//! let mut client = CourierClient::new();
//! client.connect("loopback", 0, false);
//! client.publish("sensors/temp", &b"21.5"[..], QoS::AtMostOnce, false);
//!
//! while let Some(event) = client.next_event().await {
//!     match event {
//!         ClientEvent::Connected => println!("connected"),
//!         ClientEvent::Message { topic, payload } => {
//!             println!("{topic}: {payload:?}");
//!             break;
//!         }
//!         other => println!("{other:?}"),
//!     }
//! }
//!
//! client.shutdown().await;
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod runtime;
pub mod testing;
pub mod transport;

pub use client::CourierClient;
pub use codec::{CodecError, Decoded, FrameCodec, PacketCodec};
pub use config::{ConfigError, CourierConfig};
pub use error::{CourierError, CourierResult};
pub use message::{ClientEvent, OutgoingMessage, QoS, SubscriptionAction, SubscriptionRequest};
pub use runtime::{ConnectionState, ConnectionTarget};
pub use transport::{Inbound, LoopbackTransport, TcpTransport, Transport, TransportError};
