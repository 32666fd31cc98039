use displaydoc::Display;
use thiserror::Error;

/// Errors raised once bridge-level retries are exhausted or a target cannot
/// be resolved.
#[derive(Debug, Display, Error)]
pub enum TransportError {
    /// no contact info known for station {0}
    UnknownStation(String),
    /// failed to establish a connection to {0}: {1}
    DialFailed(String, String),
    /// send to {0} failed after exhausting retries: {1}
    SendExhausted(String, String),
    /// received envelope failed validation: {0}
    InvalidEnvelope(String),
}

/// Convenience alias for results returned by this crate.
pub type TransportResult<T> = Result<T, TransportError>;
