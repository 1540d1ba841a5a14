//! TCP transport backed by tokio.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::{Inbound, Transport, TransportError};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_CHUNK: usize = 8 * 1024;

/// Plain-TCP transport. TLS endpoints are rejected at establish time; a
/// TLS-capable implementation can be swapped in behind the same trait.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            stream: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            stream: None,
            connect_timeout,
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn establish(
        &mut self,
        host: &str,
        port: u16,
        secure: bool,
    ) -> Result<(), TransportError> {
        if secure {
            return Err(TransportError::EstablishFailed(
                "TLS is not supported by TcpTransport".to_string(),
            ));
        }

        let addr = format!("{host}:{port}");
        debug!(%addr, "opening tcp connection");

        let connect = TcpStream::connect(&addr);
        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TransportError::EstablishFailed(format!("{addr}: {e}")));
            }
            Err(_) => {
                return Err(TransportError::EstablishFailed(format!(
                    "{addr}: connect timed out after {:?}",
                    self.connect_timeout
                )));
            }
        };

        // Frames are small and latency matters more than throughput here.
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "failed to set TCP_NODELAY");
        }

        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotEstablished)?;
        stream.write_all(&frame).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn poll_receive(&mut self) -> Result<Inbound, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotEstablished)?;

        let mut buf = vec![0u8; READ_CHUNK];
        match stream.try_read(&mut buf) {
            Ok(0) => Ok(Inbound::Closed),
            Ok(n) => {
                buf.truncate(n);
                Ok(Inbound::Data(Bytes::from(buf)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Inbound::Idle),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!(error = %e, "tcp shutdown failed");
            }
        }
    }
}
