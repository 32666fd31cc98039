use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bth_common::StationId;

/// How a connection is identified before and after the peer's station
/// identity is known. Once the first frame reveals the remote station id,
/// higher layers should key on [`PeerKey::Station`] going forward; the
/// provisional identifier is an internal detail of acceptance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PeerKey {
    /// An inbound connection whose remote station id is not yet known.
    Provisional(u64),
    /// A connection identified by its remote station id.
    Station(StationId),
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerKey::Provisional(id) => write!(f, "provisional:{id}"),
            PeerKey::Station(id) => write!(f, "{id}"),
        }
    }
}

static NEXT_PROVISIONAL_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a fresh provisional peer identifier for a newly accepted
/// connection.
pub fn next_provisional_id() -> u64 {
    NEXT_PROVISIONAL_ID.fetch_add(1, Ordering::Relaxed)
}

/// The physical transport a connection runs over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionType {
    /// A raw TCP connection, length-delimited JSON framed.
    Tcp,
    /// A WebSocket connection, one JSON frame per WebSocket message.
    WebSocket,
}

/// The lifecycle state of a connection.
///
/// `Authenticated` is aspirational: the codec currently treats `Connected`
/// as the delivery-ready state, and gates sends on it. `Authenticated` is
/// reserved for when message signing is added.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No socket exists.
    Disconnected,
    /// A dial or accept handshake is in progress.
    Connecting,
    /// The socket is open and ready to carry frames.
    Connected,
    /// Reserved for when message signing is added.
    Authenticated,
    /// The connection failed and was torn down.
    Error,
}
