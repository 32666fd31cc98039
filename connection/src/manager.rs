use std::collections::HashMap;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::actor::spawn_connection_actor;
use crate::config::ConnectionManagerConfig;
use crate::error::{ConnectionError, ConnectionResult};
use crate::events::ConnectionEvent;
use crate::handle::ConnectionHandle;
use crate::transport_io::Transport;
use crate::types::{next_provisional_id, ConnectionType, PeerKey};

/// Listens for inbound TCP/WebSocket connections, dials outbound
/// connections, and tracks every live connection's handle keyed by
/// [`PeerKey`].
pub struct ConnectionManager {
    config: ConnectionManagerConfig,
    connections: RwLock<HashMap<PeerKey, ConnectionHandle>>,
    event_tx: mpsc::Sender<ConnectionEvent>,
}

impl ConnectionManager {
    /// Builds a manager bound to `config`, returning the manager and the
    /// receiving half of its event channel.
    pub fn new(config: ConnectionManagerConfig) -> (Arc<Self>, mpsc::Receiver<ConnectionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let manager = Arc::new(Self {
            config,
            connections: RwLock::new(HashMap::new()),
            event_tx,
        });
        (manager, event_rx)
    }

    /// Binds the TCP listen port and accepts connections until the process
    /// stops or the returned task is aborted.
    pub fn listen_tcp(self: &Arc<Self>) -> ConnectionResult<tokio::task::JoinHandle<()>> {
        let manager = Arc::clone(self);
        let addr = format!("0.0.0.0:{}", self.config.listen_port);
        Ok(tokio::spawn(async move {
            let listener = match TcpListener::bind(&addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    warn!(%addr, %err, "failed to bind TCP listener");
                    return;
                }
            };
            info!(%addr, "listening for TCP connections");
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        info!(%peer_addr, "accepted TCP connection");
                        manager.accept_tcp(stream).await;
                    }
                    Err(err) => warn!(%err, "failed to accept TCP connection"),
                }
            }
        }))
    }

    /// Binds the WebSocket listen port (`listen_port + 1`) and accepts
    /// connections until the process stops or the returned task is aborted.
    pub fn listen_websocket(self: &Arc<Self>) -> ConnectionResult<tokio::task::JoinHandle<()>> {
        let manager = Arc::clone(self);
        let addr = format!("0.0.0.0:{}", self.config.websocket_port());
        Ok(tokio::spawn(async move {
            let listener = match TcpListener::bind(&addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    warn!(%addr, %err, "failed to bind WebSocket listener");
                    return;
                }
            };
            info!(%addr, "listening for WebSocket connections");
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        info!(%peer_addr, "accepted WebSocket connection");
                        manager.accept_websocket(stream).await;
                    }
                    Err(err) => warn!(%err, "failed to accept WebSocket connection"),
                }
            }
        }))
    }

    async fn accept_tcp(self: &Arc<Self>, stream: TcpStream) {
        if self.is_at_capacity().await {
            warn!("rejecting inbound TCP connection: at max_connections");
            return;
        }
        let transport = Transport::new_tcp(stream, self.config.max_frame_bytes);
        let peer_key = PeerKey::Provisional(next_provisional_id());
        self.register(peer_key, transport, ConnectionType::Tcp).await;
    }

    async fn accept_websocket(self: &Arc<Self>, stream: TcpStream) {
        if self.is_at_capacity().await {
            warn!("rejecting inbound WebSocket connection: at max_connections");
            return;
        }
        let ws = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(err) => {
                warn!(%err, "WebSocket handshake failed");
                return;
            }
        };
        let transport = Transport::new_websocket(ws);
        let peer_key = PeerKey::Provisional(next_provisional_id());
        self.register(peer_key, transport, ConnectionType::WebSocket).await;
    }

    async fn is_at_capacity(&self) -> bool {
        self.connections.read().await.len() >= self.config.max_connections
    }

    async fn register(self: &Arc<Self>, peer_key: PeerKey, transport: Transport, connection_type: ConnectionType) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let handle = ConnectionHandle::new(peer_key.clone(), connection_type, command_tx);
        self.connections.write().await.insert(peer_key, handle.clone());
        spawn_connection_actor(transport, handle, command_rx, self.event_tx.clone(), self.config.clone());
    }

    /// Dials `host:port` and registers the resulting connection under
    /// `peer_key` (typically the remote station id once known).
    pub async fn connect_to_peer(
        self: &Arc<Self>,
        peer_key: PeerKey,
        host: &str,
        port: u16,
        connection_type: ConnectionType,
    ) -> ConnectionResult<ConnectionHandle> {
        let addr = format!("{host}:{port}");
        let stream = timeout(self.config.connection_timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| ConnectionError::DialTimeout(addr.clone()))??;

        let transport = match connection_type {
            ConnectionType::Tcp => Transport::new_tcp(stream, self.config.max_frame_bytes),
            ConnectionType::WebSocket => {
                let url = format!("ws://{addr}");
                let (ws, _response) = timeout(
                    self.config.connection_timeout(),
                    tokio_tungstenite::client_async(url, stream),
                )
                .await
                .map_err(|_| ConnectionError::DialTimeout(addr.clone()))??;
                Transport::new_websocket(ws)
            }
        };

        let (command_tx, command_rx) = mpsc::channel(64);
        let handle = ConnectionHandle::new(peer_key.clone(), connection_type, command_tx);
        self.connections.write().await.insert(peer_key, handle.clone());
        spawn_connection_actor(transport, handle.clone(), command_rx, self.event_tx.clone(), self.config.clone());
        Ok(handle)
    }

    /// Writes `bytes` as one frame on the connection for `peer_key`. Never
    /// dials implicitly: a missing connection is a hard error.
    pub async fn send_message(&self, peer_key: &PeerKey, bytes: Vec<u8>) -> ConnectionResult<()> {
        let handle = {
            let connections = self.connections.read().await;
            connections
                .get(peer_key)
                .cloned()
                .ok_or_else(|| ConnectionError::NotConnected(peer_key.to_string()))?
        };
        handle.send(bytes).await
    }

    /// Returns the handle for `peer_key`, if a connection for it is live.
    pub async fn get_connection(&self, peer_key: &PeerKey) -> Option<ConnectionHandle> {
        self.connections.read().await.get(peer_key).cloned()
    }

    /// Removes a handle that has reported itself disconnected. Called by
    /// higher layers consuming [`ConnectionEvent::PeerDisconnected`].
    pub async fn forget(&self, peer_key: &PeerKey) {
        self.connections.write().await.remove(peer_key);
    }

    /// Every currently tracked peer key.
    pub async fn connected_peers(&self) -> Vec<PeerKey> {
        self.connections.read().await.keys().cloned().collect()
    }

    /// Spawns the keep-alive sweep: every `keep_alive_interval`, closes
    /// connections idle for more than three such intervals.
    pub fn spawn_keep_alive_sweep(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let interval = manager.config.keep_alive_interval();
            let max_idle_ms = interval.as_millis() as i64 * 3;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = bth_common::time::now_ms();
                let stale: Vec<PeerKey> = {
                    let connections = manager.connections.read().await;
                    connections
                        .iter()
                        .filter(|(_, handle)| now - handle.last_activity_ms() > max_idle_ms)
                        .map(|(key, _)| key.clone())
                        .collect()
                };
                for peer_key in stale {
                    if let Some(handle) = manager.connections.read().await.get(&peer_key).cloned() {
                        warn!(peer = %peer_key, "closing idle connection");
                        handle.close().await;
                    }
                }
            }
        })
    }

    /// Graceful shutdown: closes every tracked connection. Safe to call more
    /// than once.
    pub async fn close_all(&self) {
        let connections = self.connections.read().await;
        for handle in connections.values() {
            handle.close().await;
        }
    }
}
