//! Mock implementations for testing.
//!
//! `ScriptedTransport` stands in for a real connection: tests script its
//! establishment outcome and inbound traffic through a [`ScriptHandle`] that
//! stays usable after the transport has moved into the worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::transport::{Inbound, Transport, TransportError};

#[derive(Debug)]
enum ScriptedInbound {
    Data(Bytes),
    Closed,
}

#[derive(Debug, Default)]
struct Shared {
    sent: Mutex<Vec<Bytes>>,
    inbound: Mutex<VecDeque<ScriptedInbound>>,
    fail_next_send: AtomicBool,
    established: AtomicBool,
    establish_attempts: Mutex<u32>,
    closed_count: Mutex<u32>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Transport double driven by a script. Build with [`ScriptedTransport::new`]
/// or [`ScriptedTransport::with_establish_failure`].
#[derive(Debug)]
pub struct ScriptedTransport {
    shared: Arc<Shared>,
    establish_error: Option<String>,
}

/// Test-side view into a [`ScriptedTransport`] that has moved into the
/// worker.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    shared: Arc<Shared>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, ScriptHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: shared.clone(),
                establish_error: None,
            },
            ScriptHandle { shared },
        )
    }

    /// A transport whose every establishment attempt fails with `reason`.
    pub fn with_establish_failure(reason: &str) -> (Self, ScriptHandle) {
        let (mut transport, handle) = Self::new();
        transport.establish_error = Some(reason.to_string());
        (transport, handle)
    }
}

impl ScriptHandle {
    /// Queue bytes the transport will report as received.
    pub fn push_data(&self, bytes: Bytes) {
        lock(&self.shared.inbound).push_back(ScriptedInbound::Data(bytes));
    }

    /// Queue a peer-side connection close.
    pub fn push_closed(&self) {
        lock(&self.shared.inbound).push_back(ScriptedInbound::Closed);
    }

    /// Make the next send fail with a broken-pipe error.
    pub fn fail_next_send(&self) {
        self.shared.fail_next_send.store(true, Ordering::SeqCst);
    }

    /// Everything the worker has transmitted so far.
    pub fn sent_frames(&self) -> Vec<Bytes> {
        lock(&self.shared.sent).clone()
    }

    pub fn is_established(&self) -> bool {
        self.shared.established.load(Ordering::SeqCst)
    }

    /// How many times the worker closed the transport.
    pub fn closed_count(&self) -> u32 {
        *lock(&self.shared.closed_count)
    }

    /// How many establishment attempts the worker has made.
    pub fn establish_attempts(&self) -> u32 {
        *lock(&self.shared.establish_attempts)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn establish(
        &mut self,
        _host: &str,
        _port: u16,
        _secure: bool,
    ) -> Result<(), TransportError> {
        *lock(&self.shared.establish_attempts) += 1;
        if let Some(reason) = &self.establish_error {
            return Err(TransportError::EstablishFailed(reason.clone()));
        }
        self.shared.established.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        if !self.shared.established.load(Ordering::SeqCst) {
            return Err(TransportError::NotEstablished);
        }
        if self.shared.fail_next_send.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted send failure",
            )));
        }
        lock(&self.shared.sent).push(frame);
        Ok(())
    }

    async fn poll_receive(&mut self) -> Result<Inbound, TransportError> {
        if !self.shared.established.load(Ordering::SeqCst) {
            return Err(TransportError::NotEstablished);
        }
        match lock(&self.shared.inbound).pop_front() {
            Some(ScriptedInbound::Data(bytes)) => Ok(Inbound::Data(bytes)),
            Some(ScriptedInbound::Closed) => Ok(Inbound::Closed),
            None => Ok(Inbound::Idle),
        }
    }

    async fn close(&mut self) {
        self.shared.established.store(false, Ordering::SeqCst);
        *lock(&self.shared.closed_count) += 1;
    }
}
