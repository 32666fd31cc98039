use serde::{Deserialize, Serialize};

use bth_common::{NodeId, StationId};

use crate::types::PayloadType;

/// The payload block of a bridge message. `data` is opaque to the codec: if
/// `encrypted` is set, it carries ciphertext produced by `bth-crypto`'s
/// hybrid sealing rather than a plain JSON string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// The payload's message type.
    #[serde(rename = "type")]
    pub payload_type: PayloadType,
    /// Opaque payload body: plain JSON, or ciphertext when `encrypted`.
    pub data: String,
    /// Whether `data` is sealed ciphertext.
    pub encrypted: bool,
}

impl Payload {
    /// Builds an unencrypted payload carrying a JSON-serialized `body`.
    pub fn plain<T: Serialize>(
        payload_type: PayloadType,
        body: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            payload_type,
            data: serde_json::to_string(body)?,
            encrypted: false,
        })
    }
}

/// Status reported in an ACK payload's body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    /// The message was delivered to its destination.
    Delivered,
    /// The message was accepted and queued for later delivery.
    Queued,
    /// Delivery failed.
    Failed,
}

/// The body carried in an `ack`-typed payload's `data` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    /// The id of the message being acknowledged.
    pub original_message_id: String,
    /// Delivery status.
    pub status: AckStatus,
    /// When the ACK was produced, ms since epoch.
    pub timestamp: i64,
    /// Position in the outbound queue, if `status` is `queued`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    /// Estimated delivery time, ms since epoch, if `status` is `queued`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<i64>,
}

/// A single mesh node entry in a node discovery payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredNode {
    /// The node's numeric identifier.
    pub node_id: NodeId,
    /// A human-readable node name.
    pub name: String,
    /// When the node was last heard from, ms since epoch.
    pub last_seen: i64,
    /// Signal quality as reported by the radio driver.
    pub signal: i32,
}

/// The body carried in a `node_discovery`-typed payload's `data` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDiscoveryPayload {
    /// Nodes visible to the announcing station.
    pub nodes: Vec<DiscoveredNode>,
    /// The announcing station.
    pub station_id: StationId,
    /// When the announcement was produced, ms since epoch.
    pub timestamp: i64,
}

/// Outbound queue depth counters reported in a station info payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Messages waiting to be sent.
    pub pending: u32,
    /// Messages currently being sent.
    pub processing: u32,
    /// Messages that failed after exhausting retries.
    pub failed: u32,
}

/// The body carried in a `station_info`-typed payload's `data` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationInfoPayload {
    /// The reporting station.
    pub station_id: StationId,
    /// A human-readable display name.
    pub display_name: String,
    /// An optional free-text location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// An optional operator contact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Advertised capability tags.
    pub capabilities: Vec<String>,
    /// Number of nodes known to this station.
    pub node_count: u32,
    /// Outbound queue state.
    pub queue_status: QueueStatus,
}

/// A single node row carried in a registry sync payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySyncNode {
    /// The node's numeric identifier.
    pub node_id: NodeId,
    /// The station that owns this row.
    pub station_id: StationId,
    /// When the node was last heard from, ms since epoch.
    pub last_seen: i64,
    /// Whether the owning station currently considers the node online.
    pub is_online: bool,
    /// Seconds after `last_seen` at which this row expires.
    pub ttl: u32,
}

/// The body carried in a `node_registry_sync`-typed payload's `data` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySyncPayload {
    /// The sending station's registry version counter.
    pub version: u64,
    /// The sending station.
    pub station_id: StationId,
    /// The sending station's own node rows.
    pub nodes: Vec<RegistrySyncNode>,
    /// When the sync was produced, ms since epoch.
    pub timestamp: i64,
    /// A stable 16-character prefix of SHA-256 over the pipe-joined
    /// `nodeId:stationId:lastSeen` triples, letting recipients short-circuit
    /// comparison when it matches their own.
    pub checksum: String,
}
