use serde::{Deserialize, Serialize};

use bth_common::{NodeId, StationId};

/// A single `(nodeId, stationId)` row in the cross-station registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRegistryEntry {
    /// The mesh node this row describes.
    pub node_id: NodeId,
    /// The station that owns this row and may mutate it.
    pub station_id: StationId,
    /// When the node was last heard from, ms since epoch.
    pub last_seen: i64,
    /// Whether the owning station currently considers the node online.
    pub is_online: bool,
    /// Opaque metadata attached by the owning station.
    pub metadata: serde_json::Value,
    /// Seconds after `last_seen` at which this row expires.
    pub ttl: u32,
}

impl NodeRegistryEntry {
    /// Whether this row is still live relative to `now_ms`.
    pub fn is_live(&self, now_ms: i64) -> bool {
        now_ms <= self.last_seen + i64::from(self.ttl) * 1000
    }
}
