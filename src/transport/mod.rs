//! Byte-stream connection abstraction driven by the worker.
//!
//! The runtime never touches sockets directly; it drives a [`Transport`]
//! through the four operations below. Implementations are free to block (up
//! to their own timeouts) because exactly one worker drives each transport.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod loopback;
pub mod tcp;

pub use loopback::LoopbackTransport;
pub use tcp::TcpTransport;

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection attempt failed: {0}")]
    EstablishFailed(String),

    #[error("i/o failure")]
    Io(#[from] std::io::Error),

    #[error("transport is not established")]
    NotEstablished,

    #[error("peer closed the connection")]
    Closed,
}

/// Result of polling a transport for inbound bytes.
#[derive(Debug)]
pub enum Inbound {
    /// Bytes arrived from the peer.
    Data(Bytes),
    /// Nothing pending right now.
    Idle,
    /// The peer closed the connection.
    Closed,
}

/// A byte-stream connection to a remote endpoint.
///
/// All methods are called exclusively from the worker; implementations do
/// not need to be `Sync`.
#[async_trait]
pub trait Transport: Send {
    /// Open a connection to `host:port`. `secure` requests a TLS-wrapped
    /// stream where the implementation supports one.
    async fn establish(&mut self, host: &str, port: u16, secure: bool)
        -> Result<(), TransportError>;

    /// Transmit one encoded frame.
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;

    /// Poll for inbound bytes without blocking on the peer.
    async fn poll_receive(&mut self) -> Result<Inbound, TransportError>;

    /// Tear the connection down. Safe to call when not established.
    async fn close(&mut self);
}
