//! The background worker: one task per client owning the connection state
//! machine, draining the command queues, and driving the transport and
//! codec.
//!
//! The loop is cooperative with respect to the queues but may block on
//! transport calls; that is acceptable because each client instance has
//! exactly one worker. Cross-context signaling is a wake notify for "work
//! arrived" and a watch channel for "stop".

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dispatch::NotificationDispatcher;
use super::queues::{command_queue, CommandDrain, CommandQueue};
use super::state::{ConnectionState, ConnectionTarget, DisconnectMode, SessionShared};
use crate::codec::{Decoded, PacketCodec};
use crate::message::{OutgoingMessage, SubscriptionAction, SubscriptionRequest};
use crate::transport::{Inbound, Transport};

/// Bounded wait per loop iteration so periodic duties still run when no
/// explicit wake-up arrives.
pub(crate) const WAKE_INTERVAL: Duration = Duration::from_millis(200);

/// How long shutdown waits for the worker task before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Owner-side handle to a spawned worker. Dropping it stops and aborts the
/// task; [`WorkerHandle::shutdown`] is the graceful path.
pub(crate) struct WorkerHandle {
    outgoing: CommandQueue<OutgoingMessage>,
    subscriptions: CommandQueue<SubscriptionRequest>,
    session: Arc<SessionShared>,
    state_rx: watch::Receiver<ConnectionState>,
    wake: Arc<Notify>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn a worker on `runtime`, seeded with the owner's current session
    /// parameters.
    pub fn spawn(
        runtime: &tokio::runtime::Handle,
        transport: Box<dyn Transport>,
        codec: Box<dyn PacketCodec>,
        dispatcher: NotificationDispatcher,
        initial_target: ConnectionTarget,
    ) -> Self {
        let wake = Arc::new(Notify::new());
        let session = Arc::new(SessionShared::new(initial_target));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (outgoing, outgoing_drain) = command_queue(wake.clone());
        let (subscriptions, subscription_drain) = command_queue(wake.clone());

        let worker = Worker {
            transport,
            codec,
            dispatcher,
            session: session.clone(),
            state_tx,
            outgoing: outgoing_drain,
            subscriptions: subscription_drain,
            wake: wake.clone(),
            stop_rx,
            inbound: BytesMut::new(),
            last_send: Instant::now(),
        };
        let task = runtime.spawn(worker.run());

        Self {
            outgoing,
            subscriptions,
            session,
            state_rx,
            wake,
            stop_tx,
            task: Some(task),
        }
    }

    /// Record the endpoint for the next establishment attempt and wake the
    /// worker. Updating the target while already connecting or connected
    /// never spawns a second attempt.
    pub fn request_connect(&self, host: &str, port: u16, use_tls: bool) {
        self.session.set_endpoint(host, port, use_tls);
        self.wake.notify_one();
    }

    pub fn request_disconnect(&self, force: bool) {
        let mode = if force {
            DisconnectMode::Force
        } else {
            DisconnectMode::Graceful
        };
        self.session.request_disconnect(mode);
        self.wake.notify_one();
    }

    pub fn publish(&self, message: OutgoingMessage) -> bool {
        self.outgoing.enqueue(message)
    }

    pub fn request_subscription(&self, request: SubscriptionRequest) -> bool {
        self.subscriptions.enqueue(request)
    }

    pub fn set_credentials(&self, username: &str, password: &str) {
        self.session.set_credentials(username, password);
    }

    pub fn set_client_id(&self, client_id: &str) {
        self.session.set_client_id(client_id);
    }

    pub fn set_keep_alive(&self, keep_alive_secs: u16) {
        self.session.set_keep_alive(keep_alive_secs);
    }

    /// Last-known connection state, adjusted for a disconnect the worker has
    /// accepted but not yet carried out: a forced disconnect must read as
    /// "not connected" immediately, without a network round-trip.
    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().is_connected() && !self.session.disconnect_pending()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Stop the worker and wait up to the grace period for it to exit,
    /// aborting the task if it does not.
    pub async fn shutdown(&mut self) {
        let _ = self.stop_tx.send(true);
        self.wake.notify_one();

        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => debug!("worker shut down cleanly"),
                Ok(Err(e)) if !e.is_cancelled() => warn!(error = %e, "worker ended abnormally"),
                Ok(Err(_)) => {}
                Err(_) => {
                    warn!("worker did not stop within the grace period, aborting");
                    abort.abort();
                }
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        self.wake.notify_one();
        // Graceful shutdown needs an await; callers get that via
        // `shutdown()`. Here the task is torn down outright.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Worker {
    transport: Box<dyn Transport>,
    codec: Box<dyn PacketCodec>,
    dispatcher: NotificationDispatcher,
    session: Arc<SessionShared>,
    state_tx: watch::Sender<ConnectionState>,
    outgoing: CommandDrain<OutgoingMessage>,
    subscriptions: CommandDrain<SubscriptionRequest>,
    wake: Arc<Notify>,
    stop_rx: watch::Receiver<bool>,
    inbound: BytesMut,
    last_send: Instant,
}

impl Worker {
    async fn run(mut self) {
        debug!("worker started");

        while !*self.stop_rx.borrow() {
            let _ = tokio::time::timeout(WAKE_INTERVAL, self.wake.notified()).await;
            if *self.stop_rx.borrow() {
                break;
            }

            self.service_disconnect().await;
            self.service_establishment().await;
            self.flush_outgoing().await;
            self.flush_subscriptions().await;
            self.service_inbound().await;
            self.service_keep_alive().await;
        }

        self.transport.close().await;
        debug!("worker exiting");
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn connected(&self) -> bool {
        self.state().is_connected()
    }

    fn transition(&self, next: ConnectionState) {
        let prev = self.state();
        if prev != next {
            debug!(?prev, ?next, "connection state transition");
            let _ = self.state_tx.send(next);
        }
    }

    async fn service_disconnect(&mut self) {
        let Some(mode) = self.session.take_pending_disconnect() else {
            return;
        };

        match self.state() {
            ConnectionState::Connected => {
                if mode == DisconnectMode::Graceful {
                    self.transition(ConnectionState::Disconnecting);
                }
                info!(?mode, "disconnecting on request");
                self.transport.close().await;
                self.inbound.clear();
                self.transition(ConnectionState::Disconnected);
                self.dispatcher
                    .notify_disconnected("Client requested disconnect");
            }
            ConnectionState::Connecting | ConnectionState::Disconnecting => {
                self.transport.close().await;
                self.inbound.clear();
                self.transition(ConnectionState::Disconnected);
            }
            // Nothing established; the cleared endpoint already cancelled
            // any pending connect.
            ConnectionState::Disconnected => {}
        }
    }

    async fn service_establishment(&mut self) {
        if self.state() != ConnectionState::Disconnected || self.session.disconnect_pending() {
            return;
        }
        let mut target = self.session.snapshot_target();
        if !target.has_endpoint() {
            return;
        }

        if target.client_id.is_empty() {
            target.client_id = format!("courier-{}", Uuid::new_v4());
            self.session.set_client_id(&target.client_id);
        }

        self.transition(ConnectionState::Connecting);
        info!(
            host = %target.host,
            port = target.port,
            secure = target.use_tls,
            client_id = %target.client_id,
            "establishing connection"
        );

        match self
            .transport
            .establish(&target.host, target.port, target.use_tls)
            .await
        {
            Ok(()) => {
                self.last_send = Instant::now();
                self.transition(ConnectionState::Connected);
                self.dispatcher.notify_connected();
            }
            Err(e) => {
                warn!(error = %e, "establishment failed");
                // The endpoint is consumed by the attempt: reconnecting
                // requires another explicit connect request.
                self.session.clear_endpoint();
                self.transition(ConnectionState::Disconnected);
                self.dispatcher.notify_connect_failed(e.to_string());
            }
        }
    }

    async fn flush_outgoing(&mut self) {
        // Items stay queued while disconnected so nothing is lost between a
        // publish and the establishment that follows it.
        while self.connected() {
            let Some(message) = self.outgoing.try_next() else {
                break;
            };
            let frame = match self.codec.encode_publish(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(topic = %message.topic, error = %e, "dropping unencodable publish");
                    continue;
                }
            };
            debug!(
                topic = %message.topic,
                qos = ?message.qos,
                retain = message.retain,
                bytes = frame.len(),
                "transmitting publish"
            );
            if let Err(e) = self.transport.send(frame).await {
                self.fail_connection(format!("send failed: {e}")).await;
                return;
            }
            self.last_send = Instant::now();
        }
    }

    async fn flush_subscriptions(&mut self) {
        while self.connected() {
            let Some(request) = self.subscriptions.try_next() else {
                break;
            };
            let frame = match request.action {
                SubscriptionAction::Subscribe => self
                    .codec
                    .encode_subscribe(&request.topic_filter, request.qos),
                SubscriptionAction::Unsubscribe => {
                    self.codec.encode_unsubscribe(&request.topic_filter)
                }
            };
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    error!(
                        filter = %request.topic_filter,
                        error = %e,
                        "dropping unencodable subscription request"
                    );
                    continue;
                }
            };
            debug!(
                filter = %request.topic_filter,
                action = ?request.action,
                "transmitting subscription request"
            );
            if let Err(e) = self.transport.send(frame).await {
                self.fail_connection(format!("send failed: {e}")).await;
                return;
            }
            self.last_send = Instant::now();
        }
    }

    async fn service_inbound(&mut self) {
        if !self.connected() {
            return;
        }

        loop {
            match self.transport.poll_receive().await {
                Ok(Inbound::Data(bytes)) => self.inbound.extend_from_slice(&bytes),
                Ok(Inbound::Idle) => break,
                Ok(Inbound::Closed) => {
                    self.fail_connection("connection closed by peer".to_string())
                        .await;
                    return;
                }
                Err(e) => {
                    self.fail_connection(format!("receive failed: {e}")).await;
                    return;
                }
            }
        }

        self.decode_inbound().await;
    }

    async fn decode_inbound(&mut self) {
        loop {
            match self.codec.decode(&mut self.inbound) {
                Ok(Decoded::Message { topic, payload }) => {
                    debug!(%topic, bytes = payload.len(), "inbound message");
                    self.dispatcher.notify_message(topic, payload);
                }
                Ok(Decoded::ConnectedAck) => debug!("session acknowledged by peer"),
                Ok(Decoded::DisconnectNotice { reason }) => {
                    info!(%reason, "peer requested disconnect");
                    self.transport.close().await;
                    self.inbound.clear();
                    self.session.clear_endpoint();
                    self.transition(ConnectionState::Disconnected);
                    self.dispatcher.notify_disconnected(reason);
                    return;
                }
                Ok(Decoded::Infrastructure(frame)) => debug!(%frame, "protocol frame"),
                Ok(Decoded::Incomplete) => break,
                Err(e) => {
                    self.fail_connection(format!("decode failed: {e}")).await;
                    return;
                }
            }
        }
    }

    async fn service_keep_alive(&mut self) {
        if !self.connected() {
            return;
        }
        let keep_alive_secs = self.session.snapshot_target().keep_alive_secs;
        if keep_alive_secs == 0 {
            return;
        }
        if self.last_send.elapsed() < Duration::from_secs(u64::from(keep_alive_secs)) {
            return;
        }

        match self.codec.encode_ping() {
            Ok(frame) => {
                debug!("sending keep-alive ping");
                if let Err(e) = self.transport.send(frame).await {
                    self.fail_connection(format!("keep-alive send failed: {e}"))
                        .await;
                    return;
                }
                self.last_send = Instant::now();
            }
            Err(e) => warn!(error = %e, "codec refused keep-alive frame"),
        }
    }

    /// Common teardown for transport-level failures while connected.
    async fn fail_connection(&mut self, reason: String) {
        warn!(%reason, "transport failure");
        self.transport.close().await;
        self.inbound.clear();
        // No automatic reconnection: a fresh connect request is required.
        self.session.clear_endpoint();
        self.transition(ConnectionState::Disconnected);
        self.dispatcher.notify_disconnected(reason);
    }
}
