use crate::types::PeerKey;

/// Lifecycle and data events emitted by the connection manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection reached the `Connected` state.
    PeerConnected(PeerKey),
    /// A connection was torn down, with a human-readable reason.
    PeerDisconnected(PeerKey, String),
    /// A complete frame was received from a peer.
    MessageReceived(Vec<u8>, PeerKey),
    /// A connection failed.
    ConnectionError(PeerKey, String),
}
