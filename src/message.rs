//! Core value types exchanged between the client handle and the worker.
//!
//! Everything in this module is immutable once constructed: requests are
//! consumed exactly once by the worker, events are consumed exactly once by
//! the owner.

use bytes::Bytes;

/// Requested delivery-guarantee tier for a message.
///
/// Semantics beyond acceptance are delegated to the codec and transport;
/// the runtime itself only carries the level through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    /// Map an integer tier to a QoS level. Returns `None` for anything
    /// outside 0..=2.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    /// Integer tier of this level.
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// An outbound publish request, created by the owner context and consumed
/// exactly once by the worker. No replay or persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
}

impl OutgoingMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>, qos: QoS, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        }
    }
}

/// Whether a subscription request adds or removes a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

/// A subscribe/unsubscribe request for a single topic filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub topic_filter: String,
    pub qos: QoS,
    pub action: SubscriptionAction,
}

impl SubscriptionRequest {
    pub fn subscribe(topic_filter: impl Into<String>, qos: QoS) -> Self {
        Self {
            topic_filter: topic_filter.into(),
            qos,
            action: SubscriptionAction::Subscribe,
        }
    }

    pub fn unsubscribe(topic_filter: impl Into<String>) -> Self {
        Self {
            topic_filter: topic_filter.into(),
            qos: QoS::AtMostOnce,
            action: SubscriptionAction::Unsubscribe,
        }
    }
}

/// Owner-visible events emitted by the worker.
///
/// Events originating from the same worker iteration are delivered in
/// emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A connection was successfully established.
    Connected,
    /// An establishment attempt failed; the client remains disconnected and
    /// does not retry on its own.
    ConnectFailed { reason: String },
    /// The connection ended, either on request or because the transport
    /// failed.
    Disconnected { reason: String },
    /// An inbound message was decoded from the transport.
    Message { topic: String, payload: Bytes },
}
