//! End-to-end scenarios across two in-process stations connected over real
//! loopback TCP: local echo, local relay by name, remote relay, registry
//! sync, a targeted node query that times out, and delivery acknowledgment.
//!
//! These tests skip the config/discovery-directory layer (covered by
//! `config::tests` and the `bth-discovery` crate's own tests) and wire the
//! connection/transport/bridge/registry/dispatcher chain directly, the same
//! way `app::run` does.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};

use bth_bridge_client::{BridgeClient, BridgeClientEvent, BridgeClientProviders};
use bth_bridge_protocol::{DiscoveredNode, QueueStatus, StationInfoPayload};
use bth_common::{NodeId, StationId};
use bth_connection_manager::{ConnectionManager, ConnectionManagerConfig};
use bth_dispatcher::{LocalNode, LocalRadio, RelayDispatcher};
use bth_registry::{NodeRegistry, RegistryConfig};
use bth_transport::{PeerInfoResolver, Transport, TransportConfig};

/// Resolves every known station to `127.0.0.1:<port>`, as if their contact
/// envelopes had already been opened.
struct StaticResolver {
    peers: RwLock<HashMap<StationId, u16>>,
}

impl StaticResolver {
    fn new() -> Arc<Self> {
        Arc::new(Self { peers: RwLock::new(HashMap::new()) })
    }

    async fn add(&self, station_id: StationId, port: u16) {
        self.peers.write().await.insert(station_id, port);
    }
}

impl PeerInfoResolver for StaticResolver {
    fn resolve<'a>(
        &'a self,
        station_id: &'a StationId,
    ) -> Pin<Box<dyn Future<Output = Option<(String, u16)>> + Send + 'a>> {
        Box::pin(async move {
            self.peers.read().await.get(station_id).map(|port| ("127.0.0.1".to_string(), *port))
        })
    }
}

/// A radio with a fixed node table that records every outbound send.
struct CapturingRadio {
    nodes: Vec<LocalNode>,
    sent: StdMutex<Vec<(NodeId, String)>>,
}

impl CapturingRadio {
    fn new(nodes: Vec<LocalNode>) -> Arc<Self> {
        Arc::new(Self { nodes, sent: StdMutex::new(Vec::new()) })
    }

    fn drain(&self) -> Vec<(NodeId, String)> {
        std::mem::take(&mut self.sent.lock().unwrap())
    }
}

impl LocalRadio for CapturingRadio {
    fn nodes(&self) -> Vec<LocalNode> {
        self.nodes.clone()
    }

    fn send<'a>(
        &'a self,
        node_id: NodeId,
        text: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push((node_id, text));
            Ok(())
        })
    }
}

struct Station {
    station_id: StationId,
    radio: Arc<CapturingRadio>,
    registry: Arc<NodeRegistry>,
    dispatcher: Arc<RelayDispatcher>,
}

async fn spawn_station(
    name: &str,
    port: u16,
    nodes: Vec<LocalNode>,
    resolver: Arc<StaticResolver>,
) -> Station {
    let station_id = StationId::new(name).unwrap();

    let (connection_manager, connection_events) = ConnectionManager::new(ConnectionManagerConfig {
        listen_port: port,
        ..ConnectionManagerConfig::default()
    });
    connection_manager.listen_tcp().unwrap();

    let transport = Transport::new(connection_manager, resolver, TransportConfig::default());
    transport.clone().spawn_event_loop(connection_events);

    let radio = CapturingRadio::new(nodes);
    let info_radio = Arc::clone(&radio);
    let nodes_radio = Arc::clone(&radio);
    let providers = BridgeClientProviders {
        station_info: Arc::new({
            let station_id = station_id.clone();
            move || StationInfoPayload {
                station_id: station_id.clone(),
                display_name: "test station".to_string(),
                location: None,
                operator: None,
                capabilities: Vec::new(),
                node_count: info_radio.nodes().len() as u32,
                queue_status: QueueStatus::default(),
            }
        }),
        local_nodes: Arc::new(move || {
            nodes_radio
                .nodes()
                .into_iter()
                .map(|node| DiscoveredNode {
                    node_id: node.node_id,
                    name: node.long_name,
                    last_seen: 0,
                    signal: 0,
                })
                .collect()
        }),
    };

    let (bridge_client, bridge_events) = BridgeClient::new(transport, station_id.clone(), providers).await;

    let (registry, registry_events) = NodeRegistry::new(
        ":memory:",
        station_id.clone(),
        RegistryConfig { local_testing: true, ..RegistryConfig::default() },
    )
    .await
    .unwrap();

    let dispatcher = RelayDispatcher::new(
        radio.clone(),
        Arc::clone(&bridge_client),
        Arc::clone(&registry),
        station_id.clone(),
    );
    dispatcher.clone().spawn_registry_event_pump(registry_events);
    spawn_bridge_event_pump(Arc::clone(&dispatcher), bridge_events);

    // Give the listener a moment to bind before any peer tries to dial it.
    tokio::time::sleep(Duration::from_millis(30)).await;

    Station { station_id, radio, registry, dispatcher }
}

fn spawn_bridge_event_pump(dispatcher: Arc<RelayDispatcher>, mut events: mpsc::Receiver<BridgeClientEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let _ = dispatcher.handle_bridge_event(event).await;
        }
    });
}

fn alice() -> LocalNode {
    LocalNode { node_id: NodeId(456), long_name: "Alice Base".into(), short_name: "Alice".into() }
}

fn bob() -> LocalNode {
    LocalNode { node_id: NodeId(789), long_name: "Bob Mobile".into(), short_name: "Bob".into() }
}

#[tokio::test]
async fn local_echo_replies_to_sender() {
    let resolver = StaticResolver::new();
    let station = spawn_station("station-echo", 18447, vec![alice()], resolver).await;

    station.dispatcher.handle_packet(NodeId(456), "just saying hi".into()).await.unwrap();

    let sent = station.radio.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, NodeId(456));
    assert!(sent[0].1.contains("Echo from 456"));
    assert!(sent[0].1.contains("just saying hi"));
}

#[tokio::test]
async fn local_relay_by_name_delivers_and_confirms() {
    let resolver = StaticResolver::new();
    let station = spawn_station("station-local", 18448, vec![alice(), bob()], resolver).await;

    station.dispatcher.handle_packet(NodeId(456), "@Bob lunch at noon?".into()).await.unwrap();

    let sent = station.radio.drain();
    assert_eq!(sent.len(), 2);
    let (to_bob, body) = &sent[0];
    assert_eq!(*to_bob, NodeId(789));
    assert!(body.contains("From 456 (Alice): lunch at noon?"));
    let (to_alice, confirm) = &sent[1];
    assert_eq!(*to_alice, NodeId(456));
    assert!(confirm.contains("relayed to 789"));
    assert!(confirm.contains("(local)"));
}

#[tokio::test]
async fn remote_relay_delivers_across_stations_and_acks() {
    let resolver_a = StaticResolver::new();
    let resolver_b = StaticResolver::new();

    let station_a = spawn_station("station-a", 18449, vec![alice()], resolver_a.clone()).await;
    let station_b = spawn_station("station-b", 18451, vec![bob()], resolver_b.clone()).await;

    resolver_a.add(station_b.station_id.clone(), 18451).await;
    resolver_b.add(station_a.station_id.clone(), 18449).await;

    // station-a learns station-b owns node 789 via a registry sync, as if
    // the two had already exchanged node tables on discovery.
    station_b.registry.register_local_node(NodeId(789), serde_json::json!({"name": "Bob Mobile"}), 300).await.unwrap();
    let remote_rows = station_b.registry.get_nodes_by_station(Some(&station_b.station_id)).await.unwrap();
    assert_eq!(remote_rows.len(), 1);

    let sync_payload = bth_bridge_protocol::RegistrySyncPayload {
        version: 1,
        station_id: station_b.station_id.clone(),
        nodes: remote_rows
            .into_iter()
            .map(|entry| bth_bridge_protocol::RegistrySyncNode {
                node_id: entry.node_id,
                station_id: entry.station_id,
                last_seen: entry.last_seen,
                is_online: entry.is_online,
                ttl: entry.ttl,
            })
            .collect(),
        timestamp: 0,
        checksum: String::new(),
    };
    station_a.registry.ingest_sync(sync_payload).await.unwrap();

    station_a.dispatcher.handle_packet(NodeId(456), "@789 incoming storm".into()).await.unwrap();

    // Give the message time to cross the loopback connection and be
    // delivered into station-b's radio.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let a_sent = station_a.radio.drain();
    assert_eq!(a_sent.len(), 1);
    assert!(a_sent[0].1.contains("relayed to"));
    assert!(a_sent[0].1.contains("remote via station-b"));

    let b_sent = station_b.radio.drain();
    assert_eq!(b_sent.len(), 1);
    assert_eq!(b_sent[0].0, NodeId(789));
    assert!(b_sent[0].1.contains("From 456 (Alice): incoming storm"));
}

#[tokio::test]
async fn unrelayable_target_reports_failure_to_sender() {
    let resolver = StaticResolver::new();
    let station = spawn_station("station-notfound", 18453, vec![alice()], resolver).await;

    station.dispatcher.handle_packet(NodeId(456), "@ghost are you there?".into()).await.unwrap();

    let sent = station.radio.drain();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.starts_with("❌ Relay failed"));
}

#[tokio::test]
async fn targeted_query_for_unknown_node_times_out() {
    let resolver = StaticResolver::new();
    let station = spawn_station("station-lonely", 18455, vec![alice()], resolver).await;

    // No peers are connected, so the broadcast query goes nowhere and the
    // call must give up after the configured timeout rather than hang.
    let result = tokio::time::timeout(Duration::from_secs(2), station.registry.query_node(NodeId(999))).await;
    assert!(result.is_ok(), "query_node must respect its own timeout, not the test's");
    assert_eq!(result.unwrap().unwrap(), None);
}

#[tokio::test]
async fn instructions_status_and_nodes_commands_reply_locally() {
    let resolver = StaticResolver::new();
    let station = spawn_station("station-commands", 18457, vec![alice(), bob()], resolver).await;
    station.registry.register_local_node(NodeId(456), serde_json::json!({"name": "Alice"}), 300).await.unwrap();

    station.dispatcher.handle_packet(NodeId(456), "help".into()).await.unwrap();
    station.dispatcher.handle_packet(NodeId(456), "status".into()).await.unwrap();
    station.dispatcher.handle_packet(NodeId(456), "nodes".into()).await.unwrap();

    let sent = station.radio.drain();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].1.contains('@'));
    assert!(sent[1].1.contains("local node(s) registered"));
    assert!(sent[2].1.contains("Alice") && sent[2].1.contains("Bob"));
}
