//! Connection state machine data and the session fields shared between the
//! owner context and the worker.

use std::sync::{Mutex, MutexGuard};

/// Connection lifecycle states. Only the worker performs transitions; the
/// owner context reads the current value through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// The endpoint and session parameters for the next (or current) connection
/// attempt. Read once per attempt by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub keep_alive_secs: u16,
}

impl Default for ConnectionTarget {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            use_tls: false,
            client_id: String::new(),
            username: String::new(),
            password: String::new(),
            keep_alive_secs: 60,
        }
    }
}

impl ConnectionTarget {
    /// An empty host means "no connection attempt".
    pub fn has_endpoint(&self) -> bool {
        !self.host.is_empty()
    }
}

/// How a requested disconnect should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DisconnectMode {
    /// Walk through `Disconnecting` and tear the transport down in order.
    Graceful,
    /// Drop the transport immediately, skipping protocol-level teardown.
    Force,
}

#[derive(Debug, Default)]
struct Guarded {
    target: ConnectionTarget,
    pending_disconnect: Option<DisconnectMode>,
}

/// Session fields mutated by both contexts, guarded by a single mutex that
/// is held only for the duration of a field read or write — never across an
/// await point or an I/O call.
#[derive(Debug, Default)]
pub(crate) struct SessionShared {
    inner: Mutex<Guarded>,
}

impl SessionShared {
    pub fn new(target: ConnectionTarget) -> Self {
        Self {
            inner: Mutex::new(Guarded {
                target,
                pending_disconnect: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Guarded> {
        // A poisoned lock here only means a panicking test thread; the data
        // is plain fields and remains usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_endpoint(&self, host: &str, port: u16, use_tls: bool) {
        let mut guard = self.lock();
        guard.target.host = host.to_string();
        guard.target.port = port;
        guard.target.use_tls = use_tls;
    }

    /// Clearing the endpoint cancels any pending connection attempt.
    pub fn clear_endpoint(&self) {
        self.lock().target.host.clear();
    }

    pub fn set_credentials(&self, username: &str, password: &str) {
        let mut guard = self.lock();
        guard.target.username = username.to_string();
        guard.target.password = password.to_string();
    }

    pub fn set_client_id(&self, client_id: &str) {
        self.lock().target.client_id = client_id.to_string();
    }

    pub fn set_keep_alive(&self, keep_alive_secs: u16) {
        self.lock().target.keep_alive_secs = keep_alive_secs;
    }

    pub fn snapshot_target(&self) -> ConnectionTarget {
        self.lock().target.clone()
    }

    /// Record a disconnect request. Also clears the endpoint so the worker
    /// does not immediately re-establish.
    pub fn request_disconnect(&self, mode: DisconnectMode) {
        let mut guard = self.lock();
        guard.target.host.clear();
        // A force request wins over a queued graceful one.
        guard.pending_disconnect = match (guard.pending_disconnect, mode) {
            (Some(DisconnectMode::Force), _) | (_, DisconnectMode::Force) => {
                Some(DisconnectMode::Force)
            }
            _ => Some(DisconnectMode::Graceful),
        };
    }

    pub fn take_pending_disconnect(&self) -> Option<DisconnectMode> {
        self.lock().pending_disconnect.take()
    }

    pub fn disconnect_pending(&self) -> bool {
        self.lock().pending_disconnect.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_has_no_endpoint() {
        let target = ConnectionTarget::default();
        assert!(!target.has_endpoint());
        assert_eq!(target.port, 1883);
        assert_eq!(target.keep_alive_secs, 60);
    }

    #[test]
    fn endpoint_setters_roundtrip() {
        let session = SessionShared::default();
        session.set_endpoint("broker.example", 8883, true);
        session.set_credentials("user", "pass");
        session.set_client_id("client-1");
        session.set_keep_alive(30);

        let target = session.snapshot_target();
        assert!(target.has_endpoint());
        assert_eq!(target.host, "broker.example");
        assert_eq!(target.port, 8883);
        assert!(target.use_tls);
        assert_eq!(target.username, "user");
        assert_eq!(target.password, "pass");
        assert_eq!(target.client_id, "client-1");
        assert_eq!(target.keep_alive_secs, 30);
    }

    #[test]
    fn disconnect_request_clears_endpoint() {
        let session = SessionShared::default();
        session.set_endpoint("broker.example", 1883, false);
        session.request_disconnect(DisconnectMode::Graceful);

        assert!(!session.snapshot_target().has_endpoint());
        assert!(session.disconnect_pending());
        assert_eq!(
            session.take_pending_disconnect(),
            Some(DisconnectMode::Graceful)
        );
        assert!(!session.disconnect_pending());
    }

    #[test]
    fn force_disconnect_wins_over_graceful() {
        let session = SessionShared::default();
        session.request_disconnect(DisconnectMode::Graceful);
        session.request_disconnect(DisconnectMode::Force);
        assert_eq!(
            session.take_pending_disconnect(),
            Some(DisconnectMode::Force)
        );

        let session = SessionShared::default();
        session.request_disconnect(DisconnectMode::Force);
        session.request_disconnect(DisconnectMode::Graceful);
        assert_eq!(
            session.take_pending_disconnect(),
            Some(DisconnectMode::Force)
        );
    }

    #[test]
    fn state_connected_predicate() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Disconnecting.is_connected());
    }
}
