use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use bth_bridge_client::{BridgeClient, BridgeClientEvent};
use bth_bridge_protocol::{DiscoveredNode, Priority, RegistrySyncNode, RegistrySyncPayload};
use bth_common::{time::now_ms, NodeId, StationId};
use bth_registry::{NodeRegistry, RegistryEvent};

use crate::classify::{classify, Intent};
use crate::dedup::DedupWindow;
use crate::error::DispatcherResult;
use crate::radio::LocalRadio;
use crate::resolver::{resolve_relay_target, RelayTarget};

/// Glue between the locally attached mesh radio and the federation: parses
/// inbound radio packets, classifies them, resolves relay targets across the
/// local node table and the cross-station registry, and forwards via the
/// bridge client or back out over the radio.
pub struct RelayDispatcher {
    radio: Arc<dyn LocalRadio>,
    bridge_client: Arc<BridgeClient>,
    registry: Arc<NodeRegistry>,
    local_station: StationId,
    dedup: Mutex<DedupWindow>,
}

impl RelayDispatcher {
    /// Builds a dispatcher over an already-running radio, bridge client, and
    /// registry.
    pub fn new(
        radio: Arc<dyn LocalRadio>,
        bridge_client: Arc<BridgeClient>,
        registry: Arc<NodeRegistry>,
        local_station: StationId,
    ) -> Arc<Self> {
        Arc::new(Self {
            radio,
            bridge_client,
            registry,
            local_station,
            dedup: Mutex::new(DedupWindow::default()),
        })
    }

    fn sender_name(&self, node_id: NodeId) -> String {
        self.radio
            .nodes()
            .into_iter()
            .find(|n| n.node_id == node_id)
            .map(|n| n.short_name)
            .unwrap_or_else(|| node_id.to_string())
    }

    /// Classifies and routes a packet `{from, data}` received off the local
    /// radio.
    pub async fn handle_packet(&self, from_node: NodeId, text: String) -> DispatcherResult<()> {
        match classify(&text) {
            Intent::Relay { target_id, text } => self.handle_relay(from_node, &target_id, &text).await,
            Intent::Instructions => {
                self.radio_send(from_node, INSTRUCTIONS.to_string()).await
            }
            Intent::Status => self.handle_status(from_node).await,
            Intent::Nodes => self.handle_nodes(from_node).await,
            Intent::Echo => self.handle_echo(from_node, &text).await,
        }
    }

    async fn radio_send(&self, node_id: NodeId, text: String) -> DispatcherResult<()> {
        self.radio
            .send(node_id, text)
            .await
            .map_err(crate::error::DispatcherError::RadioSend)
    }

    async fn handle_echo(&self, from_node: NodeId, text: &str) -> DispatcherResult<()> {
        let name = self.sender_name(from_node);
        let reply = format!("🔊 Echo from {from_node} ({name}): \"{text}\"");
        self.radio_send(from_node, reply).await
    }

    async fn handle_status(&self, from_node: NodeId) -> DispatcherResult<()> {
        let local = self.registry.get_nodes_by_station(Some(&self.local_station)).await.unwrap_or_default();
        let reply = format!("📡 {} local node(s) registered", local.len());
        self.radio_send(from_node, reply).await
    }

    async fn handle_nodes(&self, from_node: NodeId) -> DispatcherResult<()> {
        let nodes = self.radio.nodes();
        let names: Vec<String> = nodes.iter().map(|n| n.short_name.clone()).collect();
        let reply = if names.is_empty() {
            "📋 no local nodes known".to_string()
        } else {
            format!("📋 local nodes: {}", names.join(", "))
        };
        self.radio_send(from_node, reply).await
    }

    async fn handle_relay(&self, from_node: NodeId, target_id: &str, text: &str) -> DispatcherResult<()> {
        let name = self.sender_name(from_node);
        let local_nodes = self.radio.nodes();
        let target = resolve_relay_target(target_id, &local_nodes, &self.registry, &self.local_station).await;

        match target {
            RelayTarget::Local(node) => {
                let first_sighting = self
                    .dedup
                    .lock()
                    .await
                    .observe(self.local_station.clone(), from_node, node.node_id, text.to_string());
                if !first_sighting {
                    return Ok(());
                }
                let relayed = format!("📨 From {from_node} ({name}): {text}");
                self.radio_send(node.node_id, relayed).await?;
                let confirm = format!(
                    "✅ Message relayed to {} ({}) (local)",
                    node.node_id, node.long_name
                );
                self.radio_send(from_node, confirm).await
            }
            RelayTarget::Remote {
                station_id,
                node_id,
                display_name,
            } => {
                let to_node = node_id.unwrap_or(NodeId(0));
                let first_sighting = self
                    .dedup
                    .lock()
                    .await
                    .observe(self.local_station.clone(), from_node, to_node, text.to_string());
                if !first_sighting {
                    return Ok(());
                }
                let relayed = format!("From {from_node} ({name}): {text}");
                if let Err(err) = self
                    .bridge_client
                    .send_user_message(station_id.clone(), from_node, to_node, relayed, Priority::Normal)
                    .await
                {
                    let failure = format!("❌ Relay failed … {err}");
                    return self.radio_send(from_node, failure).await;
                }
                let confirm = format!("✅ Message relayed to {display_name} (remote via {station_id})");
                self.radio_send(from_node, confirm).await
            }
            RelayTarget::NotFound => {
                let failure = format!("❌ Relay failed … no such target \"{target_id}\"");
                self.radio_send(from_node, failure).await
            }
        }
    }

    /// Routes a typed event re-emitted by the bridge client: delivers
    /// incoming user messages to the local radio, ingests registry traffic,
    /// and answers targeted node queries.
    pub async fn handle_bridge_event(&self, event: BridgeClientEvent) -> DispatcherResult<()> {
        match event {
            BridgeClientEvent::UserMessage {
                from_station,
                from_node,
                to_node,
                text,
            } => {
                let first_sighting = self.dedup.lock().await.observe(from_station, from_node, to_node, text.clone());
                if first_sighting {
                    self.radio_send(to_node, text).await?;
                }
            }
            BridgeClientEvent::Command { from_station, command, .. } => {
                debug!(%from_station, %command, "command delivery is not routed to the local radio");
            }
            BridgeClientEvent::StationInfo(_) => {}
            BridgeClientEvent::NodeDiscovery(payload) => {
                self.ingest_discovered_nodes(payload.station_id, payload.nodes).await;
            }
            BridgeClientEvent::RegistrySync(payload) => {
                if let Err(err) = self.registry.ingest_sync(payload).await {
                    warn!(%err, "failed to ingest registry sync payload");
                }
            }
            BridgeClientEvent::NodeQuery { from_station, query } => {
                if let Err(err) = self.registry.handle_query(query).await {
                    warn!(%err, %from_station, "failed to answer node query");
                }
            }
            BridgeClientEvent::NodeQueryResponse(response) => {
                self.registry.handle_query_response(response).await;
            }
        }
        Ok(())
    }

    async fn ingest_discovered_nodes(&self, station_id: StationId, nodes: Vec<DiscoveredNode>) {
        if station_id == self.local_station {
            return;
        }
        let sync_nodes: Vec<RegistrySyncNode> = nodes
            .into_iter()
            .map(|node| RegistrySyncNode {
                node_id: node.node_id,
                station_id: station_id.clone(),
                last_seen: node.last_seen,
                is_online: true,
                ttl: 300,
            })
            .collect();
        let payload = RegistrySyncPayload {
            version: 0,
            station_id,
            nodes: sync_nodes,
            timestamp: now_ms(),
            checksum: String::new(),
        };
        if let Err(err) = self.registry.ingest_sync(payload).await {
            warn!(%err, "failed to ingest node discovery payload into registry");
        }
    }

    /// Exchanges node tables with a newly discovered peer: asks for its
    /// list and pushes our own.
    pub async fn on_peer_discovered(&self, station_id: StationId) -> DispatcherResult<()> {
        if let Err(err) = self.bridge_client.request_node_discovery(station_id.clone()).await {
            warn!(%station_id, %err, "failed to request peer node discovery");
        }
        let own_nodes: Vec<DiscoveredNode> = self
            .radio
            .nodes()
            .into_iter()
            .map(|node| DiscoveredNode {
                node_id: node.node_id,
                name: node.long_name,
                last_seen: now_ms(),
                signal: 0,
            })
            .collect();
        self.bridge_client.broadcast_node_discovery(own_nodes).await;
        Ok(())
    }

    /// Removes a lost peer's rows from the registry.
    pub async fn on_peer_lost(&self, station_id: &StationId) -> DispatcherResult<()> {
        let removed = self.registry.on_peer_lost(station_id).await?;
        if removed > 0 {
            debug!(%station_id, removed, "purged registry rows for lost peer");
        }
        Ok(())
    }

    /// Drains registry events, transmitting outbound sync/query/response
    /// traffic via the bridge client. The registry never depends on the
    /// bridge client directly; this pump is the wiring that closes the loop.
    pub fn spawn_registry_event_pump(self: Arc<Self>, mut registry_events: mpsc::Receiver<RegistryEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = registry_events.recv().await {
                match event {
                    RegistryEvent::OutboundSync(payload) => {
                        self.bridge_client.broadcast_registry_sync(payload).await;
                    }
                    RegistryEvent::OutboundQuery(query) => {
                        self.bridge_client.broadcast_node_query(query).await;
                    }
                    RegistryEvent::OutboundQueryResponse { target_station, response } => {
                        if let Err(err) = self.bridge_client.send_node_query_response(target_station, response).await {
                            warn!(%err, "failed to send node query response");
                        }
                    }
                    RegistryEvent::NodeAdded(_)
                    | RegistryEvent::NodeUpdated(_)
                    | RegistryEvent::NodeRemoved(_, _)
                    | RegistryEvent::Conflict(_) => {}
                }
            }
        })
    }
}

const INSTRUCTIONS: &str = "ℹ️ commands: @<name|id> <text> to relay, status, nodes, help";

#[cfg(test)]
mod tests {
    use super::*;
    use bth_registry::RegistryConfig;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex as StdMutex;

    use crate::radio::LocalNode;

    struct FakeRadio {
        nodes: Vec<LocalNode>,
        sent: StdMutex<Vec<(NodeId, String)>>,
    }

    impl LocalRadio for FakeRadio {
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

    fn alice_bob_radio() -> Arc<FakeRadio> {
        Arc::new(FakeRadio {
            nodes: vec![
                LocalNode {
                    node_id: NodeId(456),
                    long_name: "Alice Base".into(),
                    short_name: "Alice".into(),
                },
                LocalNode {
                    node_id: NodeId(789),
                    long_name: "Bob Mobile".into(),
                    short_name: "Bob".into(),
                },
            ],
            sent: StdMutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn dedup_window_suppresses_repeated_bridge_deliveries() {
        let (registry, _rx) = NodeRegistry::new(
            ":memory:",
            StationId::new("station-a").unwrap(),
            RegistryConfig { local_testing: true, ..RegistryConfig::default() },
        )
        .await
        .unwrap();
        let radio = alice_bob_radio();

        // A dispatcher with no live bridge client/transport would panic if
        // handle_relay actually tried to send; this test only exercises the
        // dedup gate on the bridge-event path, which never touches the
        // bridge client.
        let dedup = Mutex::new(DedupWindow::default());
        let from_station = StationId::new("station-b").unwrap();
        let first = dedup.lock().await.observe(from_station.clone(), NodeId(1), NodeId(456), "hi".into());
        let second = dedup.lock().await.observe(from_station, NodeId(1), NodeId(456), "hi".into());
        assert!(first);
        assert!(!second);

        let _ = (registry, radio);
    }

    #[test]
    fn instructions_text_mentions_relay_syntax() {
        assert!(INSTRUCTIONS.contains('@'));
    }
}
