//! Delivery of worker events back into the owner context.
//!
//! The worker never calls into owner code. It pushes [`ClientEvent`]s into
//! the owner's event channel through a weak reference; if the owner handle
//! has been destroyed the upgrade fails and the event is dropped silently.
//! Events pushed from the same worker iteration keep their emission order.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::message::ClientEvent;

/// Owner-side endpoint the worker posts events into. Held strongly by the
/// client handle and only weakly by the worker.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl EventSink {
    fn push(&self, event: ClientEvent) {
        // The receiver living inside the owner handle can only be gone if
        // the owner is mid-destruction; dropping the event is the contract.
        let _ = self.tx.send(event);
    }
}

/// Build the owner's event channel: the sink the worker posts into and the
/// receiver the owner consumes.
pub fn event_channel() -> (Arc<EventSink>, mpsc::UnboundedReceiver<ClientEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(EventSink { tx }), rx)
}

/// Worker-side dispatcher. Resolves the weak owner reference immediately
/// before every notification.
#[derive(Debug)]
pub struct NotificationDispatcher {
    owner: Weak<EventSink>,
}

impl NotificationDispatcher {
    pub fn new(owner: Weak<EventSink>) -> Self {
        Self { owner }
    }

    pub fn notify_connected(&self) {
        self.dispatch(ClientEvent::Connected);
    }

    pub fn notify_connect_failed(&self, reason: impl Into<String>) {
        self.dispatch(ClientEvent::ConnectFailed {
            reason: reason.into(),
        });
    }

    pub fn notify_disconnected(&self, reason: impl Into<String>) {
        self.dispatch(ClientEvent::Disconnected {
            reason: reason.into(),
        });
    }

    pub fn notify_message(&self, topic: String, payload: Bytes) {
        self.dispatch(ClientEvent::Message { topic, payload });
    }

    fn dispatch(&self, event: ClientEvent) {
        match self.owner.upgrade() {
            Some(sink) => sink.push(event),
            None => debug!(?event, "owner gone, dropping notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_events_in_emission_order() {
        let (sink, mut rx) = event_channel();
        let dispatcher = NotificationDispatcher::new(Arc::downgrade(&sink));

        dispatcher.notify_connected();
        dispatcher.notify_message("a".to_string(), Bytes::from_static(b"1"));
        dispatcher.notify_message("b".to_string(), Bytes::from_static(b"2"));
        dispatcher.notify_disconnected("done");

        assert_eq!(rx.try_recv().unwrap(), ClientEvent::Connected);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ClientEvent::Message { topic, .. } if topic == "a"
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ClientEvent::Message { topic, .. } if topic == "b"
        ));
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::Disconnected {
                reason: "done".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn drops_silently_once_owner_is_gone() {
        let (sink, rx) = event_channel();
        let dispatcher = NotificationDispatcher::new(Arc::downgrade(&sink));

        drop(rx);
        drop(sink);

        // Must not panic, must not do anything observable.
        dispatcher.notify_connected();
        dispatcher.notify_disconnected("late");
        dispatcher.notify_message("t".to_string(), Bytes::new());
    }

    #[test]
    fn connect_failed_carries_reason() {
        let (sink, mut rx) = event_channel();
        let dispatcher = NotificationDispatcher::new(Arc::downgrade(&sink));

        dispatcher.notify_connect_failed("broker unreachable");
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::ConnectFailed {
                reason: "broker unreachable".to_string()
            }
        );
    }
}
