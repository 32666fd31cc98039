use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use bth_common::time::now_ms;

use crate::error::{ConnectionError, ConnectionResult};
use crate::types::{ConnectionStatus, ConnectionType, PeerKey};

/// Commands accepted by a connection's background actor task.
pub(crate) enum ConnectionCommand {
    Send(Vec<u8>),
    Close,
}

/// A cheap, cloneable reference to a live connection, owned by the
/// connection manager's map and handed out to callers that need to send on
/// or close a specific peer.
#[derive(Clone)]
pub struct ConnectionHandle {
    peer_key: PeerKey,
    connection_type: ConnectionType,
    command_tx: mpsc::Sender<ConnectionCommand>,
    status: Arc<RwLock<ConnectionStatus>>,
    last_activity_ms: Arc<AtomicI64>,
    retry_count: Arc<AtomicU32>,
}

impl ConnectionHandle {
    pub(crate) fn new(
        peer_key: PeerKey,
        connection_type: ConnectionType,
        command_tx: mpsc::Sender<ConnectionCommand>,
    ) -> Self {
        Self {
            peer_key,
            connection_type,
            command_tx,
            status: Arc::new(RwLock::new(ConnectionStatus::Connecting)),
            last_activity_ms: Arc::new(AtomicI64::new(now_ms())),
            retry_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The identifier this handle is keyed under.
    pub fn peer_key(&self) -> &PeerKey {
        &self.peer_key
    }

    /// The physical transport this connection runs over.
    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    /// The connection's current lifecycle state.
    pub async fn status(&self) -> ConnectionStatus {
        *self.status.read().await
    }

    pub(crate) async fn set_status(&self, status: ConnectionStatus) {
        *self.status.write().await = status;
    }

    /// Milliseconds since epoch of the last send or receive on this
    /// connection.
    pub fn last_activity_ms(&self) -> i64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn touch(&self) {
        self.last_activity_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Number of dial retries attempted for this peer so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::Relaxed)
    }

    pub(crate) fn increment_retry_count(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Writes a frame on this connection. Fails immediately if the
    /// underlying actor has already exited; never dials implicitly.
    pub async fn send(&self, bytes: Vec<u8>) -> ConnectionResult<()> {
        self.command_tx
            .send(ConnectionCommand::Send(bytes))
            .await
            .map_err(|_| ConnectionError::NotConnected(self.peer_key.to_string()))?;
        self.touch();
        Ok(())
    }

    /// Closes this connection.
    pub async fn close(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Close).await;
    }
}
