use serde::{Deserialize, Serialize};

use bth_registry::{NodeQueryMessage, NodeQueryResponse};

/// The small JSON body carried by a `system`-typed message. There is no
/// dedicated wire payload type for station-info/node-discovery requests or
/// for targeted registry queries, so they ride inside `system` messages as
/// this internal discriminated union.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SystemRequest {
    /// Asks the recipient to reply with a STATION_INFO payload.
    RequestStationInfo,
    /// Asks the recipient to reply with a NODE_DISCOVERY payload.
    RequestNodeDiscovery,
    /// A targeted registry query for a node not known locally.
    NodeQuery(NodeQueryMessage),
    /// A reply to a targeted registry query.
    NodeQueryResponse(NodeQueryResponse),
}
