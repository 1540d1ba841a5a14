//! In-process loopback transport.
//!
//! Every frame sent while established re-enters the receive path unchanged,
//! as if a broker had immediately forwarded it back. This is the reference
//! no-broker behavior: publishes surface as inbound messages once decoded,
//! which makes the full worker pipeline observable without a network.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{Inbound, Transport, TransportError};

/// Loopback transport that echoes transmitted frames back to the receiver.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    established: bool,
    pending: VecDeque<Bytes>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn establish(
        &mut self,
        host: &str,
        port: u16,
        _secure: bool,
    ) -> Result<(), TransportError> {
        debug!(host, port, "loopback transport established");
        self.established = true;
        Ok(())
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        if !self.established {
            return Err(TransportError::NotEstablished);
        }
        self.pending.push_back(frame);
        Ok(())
    }

    async fn poll_receive(&mut self) -> Result<Inbound, TransportError> {
        if !self.established {
            return Err(TransportError::NotEstablished);
        }
        match self.pending.pop_front() {
            Some(frame) => Ok(Inbound::Data(frame)),
            None => Ok(Inbound::Idle),
        }
    }

    async fn close(&mut self) {
        self.established = false;
        self.pending.clear();
    }
}
