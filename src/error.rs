//! Crate-level error type.
//!
//! Most of the owner-facing API reports acceptance as booleans (a request
//! being queued is not an operation completing); `CourierError` covers the
//! places where a real error can surface synchronously, and wraps the
//! layer-specific errors for callers that want one type to match on.

use thiserror::Error;

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum CourierError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result alias for fallible courier operations.
pub type CourierResult<T> = Result<T, CourierError>;
