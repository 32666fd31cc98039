use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio::time::sleep;
use tracing::{debug, warn};

use bth_bridge_protocol::{
    retry_delay, AckPayload, AckStatus, BridgeMessage, BridgeMessageOptions, PayloadType, Priority,
};
use bth_common::{time::now_ms, StationId};
use bth_connection_manager::{ConnectionEvent, ConnectionManager, ConnectionType, PeerKey};

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::handlers::HandlerRegistry;
use crate::resolver::PeerInfoResolver;
use crate::stats::TransportStats;

type Handler = std::sync::Arc<dyn Fn(BridgeMessage) + Send + Sync>;

/// Adapts the connection manager to the bridge envelope: resolves and
/// dials peers, retries sends with exponential backoff, tracks the
/// station-to-connection mapping, and dispatches received messages to
/// per-type handlers.
pub struct Transport {
    connection_manager: Arc<ConnectionManager>,
    resolver: Arc<dyn PeerInfoResolver>,
    config: TransportConfig,
    station_to_connection: RwLock<HashMap<StationId, PeerKey>>,
    pending_connections: Mutex<HashMap<StationId, Arc<Notify>>>,
    handlers: HandlerRegistry,
    stats: TransportStats,
}

impl Transport {
    /// Builds a transport over an already-listening connection manager.
    pub fn new(connection_manager: Arc<ConnectionManager>, resolver: Arc<dyn PeerInfoResolver>, config: TransportConfig) -> Arc<Self> {
        Arc::new(Self {
            connection_manager,
            resolver,
            config,
            station_to_connection: RwLock::new(HashMap::new()),
            pending_connections: Mutex::new(HashMap::new()),
            handlers: HandlerRegistry::default(),
            stats: TransportStats::default(),
        })
    }

    /// Transport-wide activity counters.
    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Installs a handler for `payload_type`'s incoming messages.
    pub async fn on_message(&self, payload_type: PayloadType, handler: Handler) {
        self.handlers.on(payload_type, handler).await;
    }

    /// Whether the transport can currently reach peers: at least one
    /// connection is live, or a resolver exists so new connections can be
    /// established.
    pub async fn is_healthy(&self) -> bool {
        !self.connection_manager.connected_peers().await.is_empty()
    }

    /// Ensures a live connection to `target` exists, enforcing at most one
    /// in-flight dial per station at a time. Concurrent callers for the
    /// same station await the same dial.
    pub async fn ensure_connection(&self, target: &StationId) -> TransportResult<PeerKey> {
        if let Some(peer_key) = self.station_to_connection.read().await.get(target).cloned() {
            if self.connection_manager.get_connection(&peer_key).await.is_some() {
                return Ok(peer_key);
            }
        }

        let notify = {
            let mut pending = self.pending_connections.lock().await;
            if let Some(existing) = pending.get(target) {
                let notify = Arc::clone(existing);
                drop(pending);
                notify.notified().await;
                return self
                    .station_to_connection
                    .read()
                    .await
                    .get(target)
                    .cloned()
                    .ok_or_else(|| TransportError::DialFailed(target.to_string(), "concurrent dial failed".into()));
            }
            let notify = Arc::new(Notify::new());
            pending.insert(target.clone(), Arc::clone(&notify));
            notify
        };

        let result = self.dial(target).await;
        self.pending_connections.lock().await.remove(target);
        notify.notify_waiters();
        result
    }

    async fn dial(&self, target: &StationId) -> TransportResult<PeerKey> {
        let (host, port) = self
            .resolver
            .resolve(target)
            .await
            .ok_or_else(|| TransportError::UnknownStation(target.to_string()))?;

        let peer_key = PeerKey::Station(target.clone());
        self.connection_manager
            .connect_to_peer(peer_key.clone(), &host, port, ConnectionType::Tcp)
            .await
            .map_err(|e| TransportError::DialFailed(target.to_string(), e.to_string()))?;

        self.station_to_connection
            .write()
            .await
            .insert(target.clone(), peer_key.clone());
        Ok(peer_key)
    }

    /// Sends `envelope`, retrying the physical send up to
    /// `config.retry_attempts + 1` times with capped exponential backoff.
    pub async fn send_message(&self, envelope: &BridgeMessage) -> TransportResult<()> {
        let target = envelope.routing.to_station.clone();
        let peer_key = self.ensure_connection(&target).await?;
        let bytes = envelope
            .to_json()
            .map_err(|e| TransportError::InvalidEnvelope(e.to_string()))?
            .into_bytes();

        let attempts = self.config.retry_attempts + 1;
        let mut last_error = String::new();
        for attempt in 0..attempts {
            match self.connection_manager.send_message(&peer_key, bytes.clone()).await {
                Ok(()) => {
                    self.stats.record_sent();
                    return Ok(());
                }
                Err(err) => {
                    self.stats.record_send_error();
                    last_error = err.to_string();
                    if attempt + 1 < attempts {
                        sleep(std::time::Duration::from_millis(retry_delay(
                            attempt,
                            self.config.retry_base_ms,
                        )))
                        .await;
                    }
                }
            }
        }
        Err(TransportError::SendExhausted(target.to_string(), last_error))
    }

    /// Fans `envelope` out to every currently connected station. Used for
    /// `toStation = "ALL"` broadcasts; no store-and-forward to offline
    /// peers.
    pub async fn broadcast(&self, envelope: &BridgeMessage) {
        let bytes = match envelope.to_json() {
            Ok(json) => json.into_bytes(),
            Err(err) => {
                warn!(%err, "failed to serialize broadcast envelope");
                return;
            }
        };
        for peer_key in self.connection_manager.connected_peers().await {
            if let Err(err) = self.connection_manager.send_message(&peer_key, bytes.clone()).await {
                self.stats.record_send_error();
                warn!(peer = %peer_key, %err, "broadcast send failed");
            } else {
                self.stats.record_sent();
            }
        }
    }

    /// Builds and sends an ACK for `original`.
    pub async fn send_ack(&self, original: &BridgeMessage, status: AckStatus) -> TransportResult<()> {
        let ack_body = AckPayload {
            original_message_id: original.message_id.clone(),
            status,
            timestamp: now_ms(),
            queue_position: None,
            estimated_delivery: None,
        };
        let data = serde_json::to_string(&ack_body)
            .map_err(|e| TransportError::InvalidEnvelope(e.to_string()))?;

        let ack = BridgeMessage::new(
            original.routing.to_station.clone(),
            original.routing.from_station.clone(),
            original.routing.to_node,
            original.routing.from_node,
            PayloadType::Ack,
            data,
            BridgeMessageOptions {
                priority: Some(Priority::High),
                ttl: Some(300),
                requires_ack: Some(false),
                max_retries: Some(2),
            },
        );
        self.send_message(&ack).await
    }

    async fn handle_incoming(&self, bytes: Vec<u8>, from_peer: PeerKey) {
        let text = match std::str::from_utf8(&bytes) {
            Ok(text) => text,
            Err(_) => {
                self.stats.record_receive_error();
                warn!("received non-UTF8 frame");
                return;
            }
        };
        let envelope = match BridgeMessage::from_json(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.stats.record_receive_error();
                warn!(%err, "received invalid bridge envelope");
                return;
            }
        };

        self.station_to_connection
            .write()
            .await
            .insert(envelope.routing.from_station.clone(), from_peer);

        self.stats.record_received();
        self.handlers.dispatch(envelope).await;
    }

    /// Drains connection manager events, feeding message frames into
    /// [`Self::handle_incoming`] and forgetting disconnected peers.
    pub fn spawn_event_loop(self: Arc<Self>, mut event_rx: mpsc::Receiver<ConnectionEvent>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match event {
                    ConnectionEvent::MessageReceived(bytes, from_peer) => {
                        self.handle_incoming(bytes, from_peer).await;
                    }
                    ConnectionEvent::PeerDisconnected(peer_key, reason) => {
                        debug!(peer = %peer_key, %reason, "peer disconnected");
                        self.connection_manager.forget(&peer_key).await;
                    }
                    ConnectionEvent::PeerConnected(_) | ConnectionEvent::ConnectionError(_, _) => {}
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bth_connection_manager::ConnectionManagerConfig;
    use tokio::time::{sleep, Duration};

    use super::*;

    /// A resolver that counts calls and pauses before answering, so two
    /// concurrent `ensure_connection` calls for the same target are certain
    /// to race inside the single-flight guard rather than happen to run
    /// sequentially.
    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl PeerInfoResolver for CountingResolver {
        fn resolve<'a>(
            &'a self,
            _station_id: &'a StationId,
        ) -> Pin<Box<dyn Future<Output = Option<(String, u16)>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                sleep(Duration::from_millis(50)).await;
                // Nothing listens here; connect_to_peer fails fast with a
                // refused connection instead of hanging.
                Some(("127.0.0.1".to_string(), 1))
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_ensure_connection_dials_once() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let (connection_manager, _event_rx) = ConnectionManager::new(ConnectionManagerConfig::default());
        let transport = Transport::new(connection_manager, resolver.clone(), TransportConfig::default());
        let target = StationId::new("beta").unwrap();

        let t1 = Arc::clone(&transport);
        let target1 = target.clone();
        let handle1 = tokio::spawn(async move { t1.ensure_connection(&target1).await });
        let t2 = Arc::clone(&transport);
        let target2 = target.clone();
        let handle2 = tokio::spawn(async move { t2.ensure_connection(&target2).await });

        let (a, b) = tokio::join!(handle1, handle2);

        // Both dials fail (nothing listens on 127.0.0.1:1), but the point
        // of the test is that only one resolve/dial ever happened.
        assert!(a.unwrap().is_err());
        assert!(b.unwrap().is_err());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }
}
