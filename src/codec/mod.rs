//! Frame encoding and decoding behind the [`PacketCodec`] trait.
//!
//! The worker hands every outbound intent to a codec and feeds every inbound
//! byte run through it; the wire layout is entirely the codec's business and
//! can be swapped without touching the runtime.

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::message::{OutgoingMessage, QoS};

pub mod frame;

pub use frame::FrameCodec;

/// Codec-layer errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("frame field is not valid utf-8")]
    InvalidUtf8,

    #[error("oversized frame: {0} bytes")]
    Oversized(usize),
}

/// Outcome of one [`PacketCodec::decode`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The peer acknowledged the session.
    ConnectedAck,
    /// An application message arrived.
    Message { topic: String, payload: Bytes },
    /// The peer is closing the session.
    DisconnectNotice { reason: String },
    /// A protocol housekeeping frame with no owner-visible effect.
    Infrastructure(String),
    /// More bytes are needed before anything can be decoded.
    Incomplete,
}

/// Encodes outbound intents into frames and decodes inbound bytes into
/// events. Driven exclusively by the worker.
pub trait PacketCodec: Send {
    fn encode_publish(&mut self, message: &OutgoingMessage) -> Result<Bytes, CodecError>;

    fn encode_subscribe(&mut self, topic_filter: &str, qos: QoS) -> Result<Bytes, CodecError>;

    fn encode_unsubscribe(&mut self, topic_filter: &str) -> Result<Bytes, CodecError>;

    /// Keep-alive probe sent when the connection has been idle for the
    /// configured interval.
    fn encode_ping(&mut self) -> Result<Bytes, CodecError>;

    /// Decode at most one event from the front of `buf`, consuming the bytes
    /// it used. Returns [`Decoded::Incomplete`] (consuming nothing) when the
    /// buffer does not yet hold a whole frame.
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Decoded, CodecError>;
}
