use bth_common::{NodeId, StationId};
use bth_registry::{NodeRegistry, NodeRegistryEntry};

use crate::radio::{resolve_local, LocalNode};

/// Where a relay target resolved to, per the fixed resolution order: local
/// radio, then remote registry, then a bare station-id fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayTarget {
    /// Resolved to a node on the local radio.
    Local(LocalNode),
    /// Resolved to a node (or just a station, if `node_id` is `None`) known
    /// via the cross-station registry or a bare station-id match.
    Remote {
        /// The owning station.
        station_id: StationId,
        /// The specific node, if one was identified.
        node_id: Option<NodeId>,
        /// A display name for user-facing confirmations.
        display_name: String,
    },
    /// None of the resolution steps matched.
    NotFound,
}

fn metadata_name(metadata: &serde_json::Value) -> String {
    metadata
        .get("name")
        .or_else(|| metadata.get("longName"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Resolves `target` against, in order: the local radio's node table, the
/// registry's non-local rows (by numeric id, then by name substring), and
/// finally a bare station-id match.
pub async fn resolve_relay_target(
    target: &str,
    local_nodes: &[LocalNode],
    registry: &NodeRegistry,
    local_station: &StationId,
) -> RelayTarget {
    if let Some(node) = resolve_local(local_nodes, target) {
        return RelayTarget::Local(node);
    }

    let remote_rows: Vec<NodeRegistryEntry> = registry
        .get_nodes_by_station(None)
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|entry| &entry.station_id != local_station)
        .collect();

    if let Ok(node_id) = target.parse::<u32>() {
        if let Some(row) = remote_rows.iter().find(|entry| entry.node_id.0 == node_id) {
            return RelayTarget::Remote {
                station_id: row.station_id.clone(),
                node_id: Some(row.node_id),
                display_name: metadata_name(&row.metadata),
            };
        }
    }

    let needle = target.to_ascii_lowercase();
    if let Some(row) = remote_rows
        .iter()
        .find(|entry| metadata_name(&entry.metadata).to_ascii_lowercase().contains(&needle))
    {
        return RelayTarget::Remote {
            station_id: row.station_id.clone(),
            node_id: Some(row.node_id),
            display_name: metadata_name(&row.metadata),
        };
    }

    if let Ok(station_id) = StationId::new(target) {
        if remote_rows.iter().any(|entry| entry.station_id == station_id) {
            return RelayTarget::Remote {
                station_id: station_id.clone(),
                node_id: None,
                display_name: station_id.to_string(),
            };
        }
    }

    RelayTarget::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use bth_registry::RegistryConfig;

    async fn registry_with(entries: &[(u32, &str, &str)], local: &str) -> NodeRegistry {
        let (registry, _rx) = NodeRegistry::new(
            ":memory:",
            StationId::new(local).unwrap(),
            RegistryConfig {
                local_testing: true,
                ..RegistryConfig::default()
            },
        )
        .await
        .unwrap();
        for (node_id, station, name) in entries {
            registry
                .register_local_node(NodeId(*node_id), serde_json::json!({"name": name}), 300)
                .await
                .unwrap();
            let _ = station;
        }
        registry
    }

    #[tokio::test]
    async fn remote_station_fallback_matches_bare_station_id() {
        let registry = registry_with(&[(1, "remote-1", "rAlpha")], "remote-1").await;
        let local_station = StationId::new("local-st").unwrap();
        let target = resolve_relay_target("remote-1", &[], &registry, &local_station).await;
        assert_eq!(
            target,
            RelayTarget::Remote {
                station_id: StationId::new("remote-1").unwrap(),
                node_id: Some(NodeId(1)),
                display_name: "rAlpha".into(),
            }
        );
    }

    #[tokio::test]
    async fn unresolvable_target_is_not_found() {
        let registry = registry_with(&[], "local-st").await;
        let local_station = StationId::new("local-st").unwrap();
        let target = resolve_relay_target("ghost", &[], &registry, &local_station).await;
        assert_eq!(target, RelayTarget::NotFound);
    }
}
