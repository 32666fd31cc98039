use serde::{Deserialize, Serialize};

use bth_common::StationId;

use crate::entry::NodeRegistryEntry;

/// How conflicting rows for the same node, reported by two different
/// stations, are resolved to a single winner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// The row with the larger `last_seen` wins.
    #[default]
    Latest,
    /// The row owned by the local station wins outright.
    StationPriority,
    /// The row with the smaller `last_seen` wins.
    FirstSeen,
}

impl ConflictStrategy {
    /// Picks the winner between `existing` and `incoming`, which must
    /// describe the same `node_id` but different `station_id`s.
    pub fn resolve<'a>(
        &self,
        local_station: &StationId,
        existing: &'a NodeRegistryEntry,
        incoming: &'a NodeRegistryEntry,
    ) -> &'a NodeRegistryEntry {
        match self {
            ConflictStrategy::Latest => {
                if incoming.last_seen > existing.last_seen {
                    incoming
                } else {
                    existing
                }
            }
            ConflictStrategy::StationPriority => {
                if &existing.station_id == local_station {
                    existing
                } else if &incoming.station_id == local_station {
                    incoming
                } else if incoming.last_seen >= existing.last_seen {
                    incoming
                } else {
                    existing
                }
            }
            ConflictStrategy::FirstSeen => {
                if incoming.last_seen <= existing.last_seen {
                    incoming
                } else {
                    existing
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bth_common::NodeId;

    fn entry(station: &str, last_seen: i64) -> NodeRegistryEntry {
        NodeRegistryEntry {
            node_id: NodeId(1),
            station_id: StationId::new(station).unwrap(),
            last_seen,
            is_online: true,
            metadata: serde_json::Value::Null,
            ttl: 300,
        }
    }

    #[test]
    fn latest_picks_larger_last_seen() {
        let local = StationId::new("local").unwrap();
        let existing = entry("alpha", 100);
        let incoming = entry("beta", 200);
        let winner = ConflictStrategy::Latest.resolve(&local, &existing, &incoming);
        assert_eq!(winner.station_id, incoming.station_id);
    }

    #[test]
    fn latest_tie_keeps_existing() {
        let local = StationId::new("local").unwrap();
        let existing = entry("alpha", 100);
        let incoming = entry("beta", 100);
        let winner = ConflictStrategy::Latest.resolve(&local, &existing, &incoming);
        assert_eq!(winner.station_id, existing.station_id);
    }

    #[test]
    fn station_priority_prefers_local_station() {
        let local = StationId::new("local").unwrap();
        let existing = entry("local", 100);
        let incoming = entry("beta", 999);
        let winner = ConflictStrategy::StationPriority.resolve(&local, &existing, &incoming);
        assert_eq!(winner.station_id, existing.station_id);
    }

    #[test]
    fn first_seen_picks_smaller_last_seen() {
        let local = StationId::new("local").unwrap();
        let existing = entry("alpha", 500);
        let incoming = entry("beta", 100);
        let winner = ConflictStrategy::FirstSeen.resolve(&local, &existing, &incoming);
        assert_eq!(winner.station_id, incoming.station_id);
    }
}
