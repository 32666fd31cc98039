use bth_bridge_protocol::RegistrySyncPayload;
use bth_common::{NodeId, StationId};

use crate::conflict::ConflictRecord;
use crate::entry::NodeRegistryEntry;

/// Registry state changes and outbound wire traffic the owning station must
/// transmit. The registry never depends on the bridge client directly, so
/// transmission is left to whoever consumes this event stream.
#[derive(Clone, Debug)]
pub enum RegistryEvent {
    /// A node row was newly inserted.
    NodeAdded(NodeRegistryEntry),
    /// An existing node row was updated in place.
    NodeUpdated(NodeRegistryEntry),
    /// A node row was removed, by node id and owning station.
    NodeRemoved(NodeId, StationId),
    /// A cross-station conflict over a node was resolved.
    Conflict(ConflictRecord),
    /// A registry sync payload is ready to broadcast to every connected
    /// station.
    OutboundSync(RegistrySyncPayload),
    /// A targeted node query is ready to broadcast while awaiting replies.
    OutboundQuery(NodeQueryMessage),
    /// A reply to a remote station's targeted query is ready to send back
    /// to `target_station`.
    OutboundQueryResponse {
        /// The station that asked.
        target_station: StationId,
        /// The reply body.
        response: NodeQueryResponse,
    },
}

/// Broadcast when a node cannot be found in the local registry, asking every
/// connected station whether they know of it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeQueryMessage {
    /// Correlates replies back to the asking call.
    pub query_id: String,
    /// The node being searched for.
    pub target_node_id: NodeId,
    /// The asking station.
    pub source_station_id: StationId,
    /// When the query was produced, ms since epoch.
    pub timestamp: i64,
}

/// A reply to a [`NodeQueryMessage`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeQueryResponse {
    /// Correlates this reply back to the originating query.
    pub query_id: String,
    /// The node that was searched for.
    pub target_node_id: NodeId,
    /// Whether the responding station has a live row for the node.
    pub found: bool,
    /// The owning station, if `found`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_id: Option<StationId>,
    /// The row's `last_seen`, if `found`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    /// The row's online flag, if `found`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
}
