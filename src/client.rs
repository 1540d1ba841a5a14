//! Owner-facing client handle.
//!
//! `CourierClient` is the only type application code needs: it forwards
//! every request into the background worker's queues and session setters,
//! and surfaces worker notifications as a [`ClientEvent`] stream. All calls
//! return without blocking; boolean returns mean "request queued", never
//! "operation completed".
//!
//! The concurrency internals live behind an opaque worker handle so they can
//! evolve without touching this contract.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::codec::{FrameCodec, PacketCodec};
use crate::config::CourierConfig;
use crate::error::CourierResult;
use crate::message::{ClientEvent, OutgoingMessage, QoS, SubscriptionRequest};
use crate::runtime::dispatch::{event_channel, EventSink, NotificationDispatcher};
use crate::runtime::{ConnectionState, ConnectionTarget, WorkerHandle};
use crate::transport::{LoopbackTransport, TcpTransport, Transport};

/// A pub/sub client backed by a dedicated background worker.
///
/// The worker is created lazily on the first call that needs it and is shut
/// down when [`CourierClient::shutdown`] runs or the handle is dropped.
/// After shutdown every call no-ops (returning `false` where a result is
/// expected) rather than faulting.
pub struct CourierClient {
    worker: Option<WorkerHandle>,
    /// Transport and codec waiting for the lazily-created worker.
    parts: Option<(Box<dyn Transport>, Box<dyn PacketCodec>)>,
    sink: Arc<EventSink>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    /// Session parameters applied to the worker when it is created and kept
    /// in sync afterwards.
    profile: ConnectionTarget,
    shut_down: bool,
}

impl CourierClient {
    /// A client wired to the in-process loopback transport and the default
    /// frame codec: publishes echo back as inbound messages.
    pub fn new() -> Self {
        Self::with_parts(
            Box::new(LoopbackTransport::new()),
            Box::new(FrameCodec::new()),
        )
    }

    /// A client driving the supplied transport and codec.
    pub fn with_parts(transport: Box<dyn Transport>, codec: Box<dyn PacketCodec>) -> Self {
        let (sink, events) = event_channel();
        Self {
            worker: None,
            parts: Some((transport, codec)),
            sink,
            events,
            profile: ConnectionTarget::default(),
            shut_down: false,
        }
    }

    /// A TCP-backed client with its session parameters resolved from
    /// configuration. Connect with [`CourierClient::connect_configured`].
    pub fn from_config(config: &CourierConfig) -> CourierResult<Self> {
        let target = config.target()?;
        let mut client =
            Self::with_parts(Box::new(TcpTransport::new()), Box::new(FrameCodec::new()));
        client.profile = target;
        Ok(client)
    }

    /// Request a connection to `host:port`. Returns `true` when the request
    /// was accepted (the worker is running and will attempt establishment),
    /// not when the connection exists; watch for [`ClientEvent::Connected`].
    ///
    /// Calling this again while a connection is pending or live only updates
    /// the recorded target.
    pub fn connect(&mut self, host: &str, port: u16, use_tls: bool) -> bool {
        self.profile.host = host.to_string();
        self.profile.port = port;
        self.profile.use_tls = use_tls;

        let Some(worker) = self.ensure_worker() else {
            return false;
        };
        worker.request_connect(host, port, use_tls);
        true
    }

    /// Connect to the endpoint recorded by [`CourierClient::from_config`].
    pub fn connect_configured(&mut self) -> bool {
        let (host, port, use_tls) = (
            self.profile.host.clone(),
            self.profile.port,
            self.profile.use_tls,
        );
        if host.is_empty() {
            warn!("connect_configured called without a configured endpoint");
            return false;
        }
        self.connect(&host, port, use_tls)
    }

    /// Request a disconnect. `force` skips graceful teardown and drops the
    /// transport immediately; `is_connected` reads `false` from this call
    /// onward either way.
    pub fn disconnect(&mut self, force: bool) {
        self.profile.host.clear();
        if let Some(worker) = &self.worker {
            worker.request_disconnect(force);
        }
    }

    /// Queue a message for publication. Items queued before the connection
    /// exists are transmitted, in order, once it does.
    pub fn publish(
        &mut self,
        topic: &str,
        payload: impl Into<Bytes>,
        qos: QoS,
        retain: bool,
    ) -> bool {
        let message = OutgoingMessage::new(topic, payload, qos, retain);
        match self.ensure_worker() {
            Some(worker) => worker.publish(message),
            None => false,
        }
    }

    /// Queue a subscription to a topic filter.
    pub fn subscribe(&mut self, topic_filter: &str, qos: QoS) -> bool {
        match self.ensure_worker() {
            Some(worker) => worker.request_subscription(SubscriptionRequest::subscribe(
                topic_filter,
                qos,
            )),
            None => false,
        }
    }

    /// Queue an unsubscribe for a topic filter.
    pub fn unsubscribe(&mut self, topic_filter: &str) -> bool {
        match self.ensure_worker() {
            Some(worker) => {
                worker.request_subscription(SubscriptionRequest::unsubscribe(topic_filter))
            }
            None => false,
        }
    }

    /// Set the credentials used by subsequent connection attempts.
    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.profile.username = username.to_string();
        self.profile.password = password.to_string();
        if let Some(worker) = &self.worker {
            worker.set_credentials(username, password);
        }
    }

    /// Set the client identifier used by subsequent connection attempts.
    /// When empty, a unique identifier is generated at establishment.
    pub fn set_client_id(&mut self, client_id: &str) {
        self.profile.client_id = client_id.to_string();
        if let Some(worker) = &self.worker {
            worker.set_client_id(client_id);
        }
    }

    /// Set the keep-alive interval in seconds; 0 disables the idle ping.
    pub fn set_keep_alive(&mut self, keep_alive_secs: u16) {
        self.profile.keep_alive_secs = keep_alive_secs;
        if let Some(worker) = &self.worker {
            worker.set_keep_alive(keep_alive_secs);
        }
    }

    /// Whether the worker last reported a live connection. Never blocks.
    pub fn is_connected(&self) -> bool {
        self.worker
            .as_ref()
            .map(WorkerHandle::is_connected)
            .unwrap_or(false)
    }

    /// Last-known connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.worker
            .as_ref()
            .map(WorkerHandle::state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Wait for the next worker event. Returns `None` once the worker is
    /// gone and all pending events have been consumed.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    /// Pop the next worker event without waiting.
    pub fn try_next_event(&mut self) -> Option<ClientEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the worker and wait (bounded) for it to exit. Afterwards the
    /// handle stays usable but every request is refused.
    pub async fn shutdown(&mut self) {
        self.shut_down = true;
        self.parts = None;
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown().await;
        }
        debug!("client shut down");
    }

    fn ensure_worker(&mut self) -> Option<&WorkerHandle> {
        if self.shut_down {
            return None;
        }
        if self.worker.is_none() {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!("cannot start worker: no tokio runtime in scope");
                return None;
            };
            let (transport, codec) = self.parts.take()?;
            let dispatcher = NotificationDispatcher::new(Arc::downgrade(&self.sink));
            self.worker = Some(WorkerHandle::spawn(
                &runtime,
                transport,
                codec,
                dispatcher,
                self.profile.clone(),
            ));
            debug!("worker started lazily");
        }
        self.worker.as_ref()
    }
}

impl Default for CourierClient {
    fn default() -> Self {
        Self::new()
    }
}
