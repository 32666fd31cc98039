use serde::{Deserialize, Serialize};

use bth_common::{NodeId, StationId};

use crate::types::BROADCAST_STATION;

/// The station/node addressing block of a bridge message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    /// Originating station.
    pub from_station: StationId,
    /// Destination station, or [`BROADCAST_STATION`] for a broadcast.
    pub to_station: StationId,
    /// Originating node. `0` for station-level control messages.
    pub from_node: NodeId,
    /// Destination node. `0` for station-level control messages.
    pub to_node: NodeId,
    /// Stations this envelope has already traversed.
    pub hops: Vec<StationId>,
}

impl Routing {
    /// Whether this envelope targets every connected station.
    pub fn is_broadcast(&self) -> bool {
        self.to_station.as_str() == BROADCAST_STATION
    }

    /// Whether `hops` already contains `from_station` twice, which would
    /// violate the envelope's hop invariant.
    pub fn has_duplicate_origin_hop(&self) -> bool {
        self.hops
            .iter()
            .filter(|hop| **hop == self.from_station)
            .count()
            > 1
    }
}
