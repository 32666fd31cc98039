use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use bth_bridge_protocol::{RegistrySyncNode, RegistrySyncPayload};
use bth_common::{time::now_ms, NodeId, StationId};
use bth_crypto::generate_message_id;

use crate::checksum::compute_checksum;
use crate::conflict::ConflictRecord;
use crate::config::RegistryConfig;
use crate::entry::NodeRegistryEntry;
use crate::error::RegistryResult;
use crate::events::{NodeQueryMessage, NodeQueryResponse, RegistryEvent};
use crate::storage::Storage;

/// The cross-station node registry: a durable store of `(node, station)`
/// rows, periodic sync/cleanup timers, conflict resolution between stations'
/// competing claims over the same node, and targeted queries for nodes not
/// known locally.
pub struct NodeRegistry {
    storage: Storage,
    config: RegistryConfig,
    local_station: StationId,
    version: AtomicU64,
    event_tx: mpsc::Sender<RegistryEvent>,
    pending_queries: Mutex<HashMap<String, oneshot::Sender<NodeQueryResponse>>>,
}

impl NodeRegistry {
    /// Opens storage at `storage_path` (or in-memory, per `config`) and
    /// returns the registry plus the receiving half of its event channel.
    pub async fn new(
        storage_path: &str,
        local_station: StationId,
        config: RegistryConfig,
    ) -> RegistryResult<(Arc<Self>, mpsc::Receiver<RegistryEvent>)> {
        let storage = Storage::open(storage_path, config.local_testing).await?;
        let (event_tx, event_rx) = mpsc::channel(256);
        let registry = Arc::new(Self {
            storage,
            config,
            local_station,
            version: AtomicU64::new(0),
            event_tx,
            pending_queries: Mutex::new(HashMap::new()),
        });
        Ok((registry, event_rx))
    }

    /// Registers a node owned by the local station, bumping the registry
    /// version and emitting `NodeAdded`.
    pub async fn register_local_node(
        &self,
        node_id: NodeId,
        metadata: serde_json::Value,
        ttl: u32,
    ) -> RegistryResult<()> {
        let entry = NodeRegistryEntry {
            node_id,
            station_id: self.local_station.clone(),
            last_seen: now_ms(),
            is_online: true,
            metadata,
            ttl,
        };
        self.storage.upsert(&entry).await?;
        self.version.fetch_add(1, Ordering::Relaxed);
        let _ = self.event_tx.send(RegistryEvent::NodeAdded(entry)).await;
        Ok(())
    }

    /// Updates a node owned by the local station. No-ops (returning `false`)
    /// if the row is currently owned by another station.
    pub async fn update_local_node(
        &self,
        node_id: NodeId,
        is_online: bool,
        metadata: serde_json::Value,
    ) -> RegistryResult<bool> {
        if let Some(existing) = self.storage.get(node_id, &self.local_station).await? {
            let _ = existing;
        } else if self.storage.find_node(node_id, now_ms()).await?.is_some() {
            // A live row exists but it's owned by another station.
            return Ok(false);
        }

        let entry = NodeRegistryEntry {
            node_id,
            station_id: self.local_station.clone(),
            last_seen: now_ms(),
            is_online,
            metadata,
            ttl: 300,
        };
        self.storage.upsert(&entry).await?;
        self.version.fetch_add(1, Ordering::Relaxed);
        let _ = self.event_tx.send(RegistryEvent::NodeUpdated(entry)).await;
        Ok(true)
    }

    /// Removes a node owned by the local station, emitting `NodeRemoved`.
    pub async fn remove_local_node(&self, node_id: NodeId) -> RegistryResult<()> {
        self.storage.remove(node_id, Some(&self.local_station)).await?;
        self.version.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .event_tx
            .send(RegistryEvent::NodeRemoved(node_id, self.local_station.clone()))
            .await;
        Ok(())
    }

    /// Finds the live row for `node_id` with the largest `last_seen`, tied
    /// by lexicographically smallest station id.
    pub async fn find_node(&self, node_id: NodeId) -> RegistryResult<Option<NodeRegistryEntry>> {
        self.storage.find_node(node_id, now_ms()).await
    }

    /// Returns every live row, optionally filtered to one owning station.
    pub async fn get_nodes_by_station(
        &self,
        station_id: Option<&StationId>,
    ) -> RegistryResult<Vec<NodeRegistryEntry>> {
        self.storage.get_nodes_by_station(station_id, now_ms()).await
    }

    /// Removes a node's row(s), optionally restricted to one station,
    /// returning the number of rows removed.
    pub async fn remove(&self, node_id: NodeId, station_id: Option<&StationId>) -> RegistryResult<u64> {
        self.storage.remove(node_id, station_id).await
    }

    /// Removes every row owned by a station that has dropped off the
    /// network, returning the number of rows removed.
    pub async fn on_peer_lost(&self, station_id: &StationId) -> RegistryResult<u64> {
        self.storage.remove_station(station_id).await
    }

    /// Ingests a remote station's sync payload, resolving any conflicts
    /// against the local view per the configured strategy.
    pub async fn ingest_sync(&self, payload: RegistrySyncPayload) -> RegistryResult<()> {
        let now = now_ms();
        for node in payload.nodes {
            let incoming = NodeRegistryEntry {
                node_id: node.node_id,
                station_id: node.station_id.clone(),
                last_seen: node.last_seen,
                is_online: node.is_online,
                metadata: serde_json::Value::Null,
                ttl: node.ttl,
            };

            match self.storage.find_node(incoming.node_id, now).await? {
                None => {
                    self.storage.upsert(&incoming).await?;
                    let _ = self.event_tx.send(RegistryEvent::NodeAdded(incoming)).await;
                }
                Some(existing) if existing.station_id == incoming.station_id => {
                    self.storage.upsert(&incoming).await?;
                    let _ = self.event_tx.send(RegistryEvent::NodeUpdated(incoming)).await;
                }
                Some(existing) => {
                    let winner = self
                        .config
                        .conflict_strategy
                        .resolve(&self.local_station, &existing, &incoming)
                        .clone();
                    let loser = if winner.station_id == existing.station_id {
                        &incoming
                    } else {
                        &existing
                    };
                    self.storage.remove(loser.node_id, Some(&loser.station_id)).await?;
                    self.storage.upsert(&winner).await?;

                    let record = ConflictRecord {
                        node_id: incoming.node_id,
                        conflicting_entries: vec![existing, incoming],
                        resolved_entry: winner,
                        strategy: self.config.conflict_strategy,
                        timestamp: now,
                    };
                    self.storage.record_conflict(&record).await?;
                    let _ = self.event_tx.send(RegistryEvent::Conflict(record)).await;
                }
            }
        }
        Ok(())
    }

    /// Answers a remote station's targeted node query from the local view.
    pub async fn handle_query(&self, query: NodeQueryMessage) -> RegistryResult<()> {
        let found = self.find_node(query.target_node_id).await?;
        let response = NodeQueryResponse {
            query_id: query.query_id,
            target_node_id: query.target_node_id,
            found: found.is_some(),
            station_id: found.as_ref().map(|e| e.station_id.clone()),
            last_seen: found.as_ref().map(|e| e.last_seen),
            is_online: found.as_ref().map(|e| e.is_online),
        };
        let _ = self
            .event_tx
            .send(RegistryEvent::OutboundQueryResponse {
                target_station: query.source_station_id,
                response,
            })
            .await;
        Ok(())
    }

    /// Resolves a pending `query_node` call with a remote station's reply.
    /// Only the first reply for a given query id is delivered.
    pub async fn handle_query_response(&self, response: NodeQueryResponse) {
        if let Some(sender) = self.pending_queries.lock().await.remove(&response.query_id) {
            let _ = sender.send(response);
        }
    }

    /// Finds `node_id` locally, or broadcasts a targeted query and awaits
    /// the first reply, giving up after the configured timeout.
    pub async fn query_node(&self, node_id: NodeId) -> RegistryResult<Option<NodeQueryResponse>> {
        if let Some(entry) = self.find_node(node_id).await? {
            return Ok(Some(NodeQueryResponse {
                query_id: String::new(),
                target_node_id: node_id,
                found: true,
                station_id: Some(entry.station_id),
                last_seen: Some(entry.last_seen),
                is_online: Some(entry.is_online),
            }));
        }

        let query_id = generate_message_id();
        let (tx, rx) = oneshot::channel();
        self.pending_queries.lock().await.insert(query_id.clone(), tx);

        let message = NodeQueryMessage {
            query_id: query_id.clone(),
            target_node_id: node_id,
            source_station_id: self.local_station.clone(),
            timestamp: now_ms(),
        };
        let _ = self.event_tx.send(RegistryEvent::OutboundQuery(message)).await;

        let result = tokio::time::timeout(self.config.query_timeout(), rx).await;
        self.pending_queries.lock().await.remove(&query_id);
        match result {
            Ok(Ok(response)) => Ok(Some(response)),
            _ => Ok(None),
        }
    }

    /// Builds a sync payload covering the local station's own live rows.
    async fn build_sync_payload(&self) -> RegistryResult<RegistrySyncPayload> {
        let nodes: Vec<RegistrySyncNode> = self
            .get_nodes_by_station(Some(&self.local_station))
            .await?
            .into_iter()
            .map(|entry| RegistrySyncNode {
                node_id: entry.node_id,
                station_id: entry.station_id,
                last_seen: entry.last_seen,
                is_online: entry.is_online,
                ttl: entry.ttl,
            })
            .collect();
        let checksum = compute_checksum(&nodes);
        Ok(RegistrySyncPayload {
            version: self.version.load(Ordering::Relaxed),
            station_id: self.local_station.clone(),
            nodes,
            timestamp: now_ms(),
            checksum,
        })
    }

    /// Spawns the sync and cleanup background timers, returning their join
    /// handles.
    pub fn spawn_timers(self: Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        let sync_registry = Arc::clone(&self);
        let sync_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sync_registry.config.sync_interval());
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match sync_registry.build_sync_payload().await {
                    Ok(payload) => {
                        let _ = sync_registry.event_tx.send(RegistryEvent::OutboundSync(payload)).await;
                    }
                    Err(err) => warn!(%err, "failed to build registry sync payload"),
                }
            }
        });

        let cleanup_registry = Arc::clone(&self);
        let cleanup_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_registry.config.cleanup_interval());
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cleanup_registry.storage.cleanup_expired(now_ms()).await {
                    Ok(purged) if purged > 0 => debug!(purged, "purged expired registry rows"),
                    Ok(_) => {}
                    Err(err) => warn!(%err, "registry cleanup failed"),
                }
            }
        });

        (sync_handle, cleanup_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ConflictStrategy;

    async fn registry(local: &str, strategy: ConflictStrategy) -> (Arc<NodeRegistry>, mpsc::Receiver<RegistryEvent>) {
        NodeRegistry::new(
            ":memory:",
            StationId::new(local).unwrap(),
            RegistryConfig {
                local_testing: true,
                conflict_strategy: strategy,
                ..RegistryConfig::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn register_then_find_round_trips() {
        let (registry, _rx) = registry("local", ConflictStrategy::Latest).await;
        registry
            .register_local_node(NodeId(1), serde_json::json!({"name": "alpha"}), 300)
            .await
            .unwrap();
        let found = registry.find_node(NodeId(1)).await.unwrap().unwrap();
        assert_eq!(found.station_id, StationId::new("local").unwrap());
    }

    #[tokio::test]
    async fn update_local_node_noops_for_foreign_owner() {
        let (registry, _rx) = registry("local", ConflictStrategy::Latest).await;
        registry
            .ingest_sync(RegistrySyncPayload {
                version: 1,
                station_id: StationId::new("remote").unwrap(),
                nodes: vec![RegistrySyncNode {
                    node_id: NodeId(1),
                    station_id: StationId::new("remote").unwrap(),
                    last_seen: now_ms(),
                    is_online: true,
                    ttl: 300,
                }],
                timestamp: now_ms(),
                checksum: String::new(),
            })
            .await
            .unwrap();

        let updated = registry
            .update_local_node(NodeId(1), false, serde_json::Value::Null)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn ingest_sync_resolves_conflict_via_latest() {
        let (registry, mut rx) = registry("local", ConflictStrategy::Latest).await;
        registry.register_local_node(NodeId(1), serde_json::Value::Null, 300).await.unwrap();
        let _ = rx.recv().await.unwrap();

        registry
            .ingest_sync(RegistrySyncPayload {
                version: 1,
                station_id: StationId::new("remote").unwrap(),
                nodes: vec![RegistrySyncNode {
                    node_id: NodeId(1),
                    station_id: StationId::new("remote").unwrap(),
                    last_seen: now_ms() + 10_000,
                    is_online: true,
                    ttl: 300,
                }],
                timestamp: now_ms(),
                checksum: String::new(),
            })
            .await
            .unwrap();

        let found = registry.find_node(NodeId(1)).await.unwrap().unwrap();
        assert_eq!(found.station_id, StationId::new("remote").unwrap());
    }

    #[tokio::test]
    async fn query_node_times_out_when_unanswered() {
        let (registry, _rx) = NodeRegistry::new(
            ":memory:",
            StationId::new("local").unwrap(),
            RegistryConfig {
                local_testing: true,
                query_timeout_secs: 1,
                ..RegistryConfig::default()
            },
        )
        .await
        .unwrap();
        let result = registry.query_node(NodeId(99)).await.unwrap();
        assert!(result.is_none());
    }
}
