use displaydoc::Display;
use thiserror::Error;

/// Errors produced by the connection manager.
#[derive(Debug, Display, Error)]
pub enum ConnectionError {
    /// no connection to peer {0}
    NotConnected(String),
    /// incoming frame of {0} bytes exceeds the configured maximum of {1}
    FrameTooLarge(usize, usize),
    /// connection attempt to {0} timed out
    DialTimeout(String),
    /// i/o error: {0}
    Io(#[from] std::io::Error),
    /// websocket error: {0}
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// connection closed
    Closed,
}

/// Convenience alias for results returned by this crate.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

impl ConnectionError {
    /// Reclassifies a generic I/O error raised by the length-delimited
    /// codec's own frame-size guard into [`ConnectionError::FrameTooLarge`].
    pub(crate) fn reclassify_frame_size(self, max_frame_bytes: usize) -> Self {
        match &self {
            ConnectionError::Io(err)
                if err.kind() == std::io::ErrorKind::InvalidData
                    && err.to_string().contains("too big") =>
            {
                ConnectionError::FrameTooLarge(0, max_frame_bytes)
            }
            _ => self,
        }
    }
}
