use std::sync::Arc;

use bth_bridge_protocol::{DiscoveredNode, StationInfoPayload};

/// Callbacks the bridge client invokes to answer `requestStationInfo` /
/// `requestNodeDiscovery` queries from peers with this station's own,
/// current state.
#[derive(Clone)]
pub struct BridgeClientProviders {
    /// Produces this station's current info payload.
    pub station_info: Arc<dyn Fn() -> StationInfoPayload + Send + Sync>,
    /// Produces this station's currently known local nodes.
    pub local_nodes: Arc<dyn Fn() -> Vec<DiscoveredNode> + Send + Sync>,
}
