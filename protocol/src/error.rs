use displaydoc::Display;
use thiserror::Error;

/// Errors produced while constructing, validating, or decoding bridge
/// messages.
#[derive(Debug, Display, Error)]
pub enum ProtocolError {
    /// bridge message is malformed: {0}
    InvalidFormat(String),
    /// unsupported protocol version: {0}
    VersionMismatch(String),
    /// message expired before it could be submitted
    Expired,
    /// failed to serialize bridge message: {0}
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias for results returned by this crate.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
