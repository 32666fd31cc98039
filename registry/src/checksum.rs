use sha2::{Digest, Sha256};

use bth_bridge_protocol::RegistrySyncNode;

/// Computes a stable 16-character prefix of SHA-256 over `nodeId:stationId:
/// lastSeen` triples, pipe-joined in `node_id` order, letting recipients of a
/// sync message short-circuit a full comparison when checksums match.
pub fn compute_checksum(nodes: &[RegistrySyncNode]) -> String {
    let mut sorted: Vec<&RegistrySyncNode> = nodes.iter().collect();
    sorted.sort_by(|a, b| (a.node_id.0, a.station_id.as_str()).cmp(&(b.node_id.0, b.station_id.as_str())));

    let joined = sorted
        .iter()
        .map(|node| format!("{}:{}:{}", node.node_id.0, node.station_id.as_str(), node.last_seen))
        .collect::<Vec<_>>()
        .join("|");

    let digest = Sha256::digest(joined.as_bytes());
    hex::encode(digest)[..16].to_string()
}
