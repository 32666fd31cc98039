use displaydoc::Display;
use thiserror::Error;

/// Errors raised while dispatching an inbound radio packet.
#[derive(Debug, Display, Error)]
pub enum DispatcherError {
    /// failed to send over the local radio: {0}
    RadioSend(String),
    /// failed to relay via the bridge client: {0}
    Relay(#[from] bth_transport::TransportError),
}

/// Convenience alias for results returned by this crate.
pub type DispatcherResult<T> = Result<T, DispatcherError>;
