use bth_bridge_protocol::{NodeDiscoveryPayload, RegistrySyncPayload, StationInfoPayload};
use bth_common::{NodeId, StationId};
use bth_registry::{NodeQueryMessage, NodeQueryResponse};

/// Typed events the bridge client re-emits for higher layers (the relay
/// dispatcher) to consume, replacing the source's ad-hoc event emitter with
/// a closed set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeClientEvent {
    /// A peer announced or answered with its node discovery payload.
    NodeDiscovery(NodeDiscoveryPayload),
    /// A peer announced or answered with its station info payload.
    StationInfo(StationInfoPayload),
    /// A peer broadcast its registry sync payload.
    RegistrySync(RegistrySyncPayload),
    /// A peer asked whether we know of a node absent from our own registry.
    NodeQuery {
        /// The station that asked.
        from_station: StationId,
        /// The query itself.
        query: NodeQueryMessage,
    },
    /// A peer replied to one of our targeted node queries.
    NodeQueryResponse(NodeQueryResponse),
    /// A USER_MESSAGE arrived from a remote station.
    UserMessage {
        /// The originating station.
        from_station: StationId,
        /// The originating node.
        from_node: NodeId,
        /// The destination node at this station.
        to_node: NodeId,
        /// The message text.
        text: String,
    },
    /// A COMMAND arrived from a remote station.
    Command {
        /// The originating station.
        from_station: StationId,
        /// The originating node.
        from_node: NodeId,
        /// The destination node at this station.
        to_node: NodeId,
        /// The command text.
        command: String,
    },
}
