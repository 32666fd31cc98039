use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use bth_bridge_protocol::{
    AckStatus, BridgeMessage, BridgeMessageOptions, NodeDiscoveryPayload, PayloadType, Priority,
    RegistrySyncPayload, StationInfoPayload,
};
use bth_common::{time::now_ms, NodeId, StationId};
use bth_transport::{Transport, TransportResult};

use crate::events::BridgeClientEvent;
use crate::providers::BridgeClientProviders;
use crate::system_request::SystemRequest;

/// Thin station-to-station façade used by the relay dispatcher: typed
/// send/broadcast/ack/discovery operations built atop [`Transport`].
pub struct BridgeClient {
    transport: Arc<Transport>,
    local_station: StationId,
    providers: BridgeClientProviders,
    event_tx: mpsc::Sender<BridgeClientEvent>,
}

impl BridgeClient {
    /// Builds a bridge client and registers its handlers on `transport` for
    /// every known payload type. Returns the client and the receiving half
    /// of its event channel.
    pub async fn new(
        transport: Arc<Transport>,
        local_station: StationId,
        providers: BridgeClientProviders,
    ) -> (Arc<Self>, mpsc::Receiver<BridgeClientEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let client = Arc::new(Self {
            transport,
            local_station,
            providers,
            event_tx,
        });
        client.register_handlers().await;
        (client, event_rx)
    }

    async fn register_handlers(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.transport
            .on_message(PayloadType::UserMessage, Arc::new(move |message| {
                let this = Arc::clone(&this);
                tokio::spawn(async move { this.handle_user_message_or_command(message, false).await });
            }))
            .await;

        let this = Arc::clone(self);
        self.transport
            .on_message(PayloadType::Command, Arc::new(move |message| {
                let this = Arc::clone(&this);
                tokio::spawn(async move { this.handle_user_message_or_command(message, true).await });
            }))
            .await;

        let this = Arc::clone(self);
        self.transport
            .on_message(PayloadType::NodeDiscovery, Arc::new(move |message| {
                let this = Arc::clone(&this);
                tokio::spawn(async move { this.handle_node_discovery(message).await });
            }))
            .await;

        let this = Arc::clone(self);
        self.transport
            .on_message(PayloadType::StationInfo, Arc::new(move |message| {
                let this = Arc::clone(&this);
                tokio::spawn(async move { this.handle_station_info(message).await });
            }))
            .await;

        let this = Arc::clone(self);
        self.transport
            .on_message(PayloadType::System, Arc::new(move |message| {
                let this = Arc::clone(&this);
                tokio::spawn(async move { this.handle_system(message).await });
            }))
            .await;

        let this = Arc::clone(self);
        self.transport
            .on_message(PayloadType::NodeRegistrySync, Arc::new(move |message| {
                let this = Arc::clone(&this);
                tokio::spawn(async move { this.handle_registry_sync(message).await });
            }))
            .await;

        self.transport
            .on_message(PayloadType::Ack, Arc::new(move |message| {
                info!(message_id = %message.message_id, "received ack, no ack-of-ack");
            }))
            .await;
    }

    async fn handle_user_message_or_command(&self, message: BridgeMessage, is_command: bool) {
        if message.delivery.requires_ack {
            if let Err(err) = self.transport.send_ack(&message, AckStatus::Delivered).await {
                warn!(%err, "failed to send ack");
            }
        }
        let event = if is_command {
            BridgeClientEvent::Command {
                from_station: message.routing.from_station,
                from_node: message.routing.from_node,
                to_node: message.routing.to_node,
                command: message.payload.data,
            }
        } else {
            BridgeClientEvent::UserMessage {
                from_station: message.routing.from_station,
                from_node: message.routing.from_node,
                to_node: message.routing.to_node,
                text: message.payload.data,
            }
        };
        let _ = self.event_tx.send(event).await;
    }

    async fn handle_node_discovery(&self, message: BridgeMessage) {
        match serde_json::from_str::<NodeDiscoveryPayload>(&message.payload.data) {
            Ok(payload) => {
                let _ = self.event_tx.send(BridgeClientEvent::NodeDiscovery(payload)).await;
            }
            Err(err) => warn!(%err, "malformed node discovery payload"),
        }
    }

    async fn handle_station_info(&self, message: BridgeMessage) {
        match serde_json::from_str::<StationInfoPayload>(&message.payload.data) {
            Ok(payload) => {
                let _ = self.event_tx.send(BridgeClientEvent::StationInfo(payload)).await;
            }
            Err(err) => warn!(%err, "malformed station info payload"),
        }
    }

    async fn handle_registry_sync(&self, message: BridgeMessage) {
        match serde_json::from_str::<RegistrySyncPayload>(&message.payload.data) {
            Ok(payload) => {
                let _ = self.event_tx.send(BridgeClientEvent::RegistrySync(payload)).await;
            }
            Err(err) => warn!(%err, "malformed registry sync payload"),
        }
    }

    async fn handle_system(&self, message: BridgeMessage) {
        match serde_json::from_str::<SystemRequest>(&message.payload.data) {
            Ok(SystemRequest::RequestStationInfo) => {
                let info = (self.providers.station_info)();
                if let Err(err) = self.send_station_info(message.routing.from_station.clone(), info).await {
                    warn!(%err, "failed to answer station info request");
                }
            }
            Ok(SystemRequest::RequestNodeDiscovery) => {
                let nodes = (self.providers.local_nodes)();
                let payload = NodeDiscoveryPayload {
                    nodes,
                    station_id: self.local_station.clone(),
                    timestamp: now_ms(),
                };
                if let Err(err) = self.send_node_discovery(message.routing.from_station.clone(), payload).await {
                    warn!(%err, "failed to answer node discovery request");
                }
            }
            Ok(SystemRequest::NodeQuery(query)) => {
                let event = BridgeClientEvent::NodeQuery {
                    from_station: message.routing.from_station,
                    query,
                };
                let _ = self.event_tx.send(event).await;
            }
            Ok(SystemRequest::NodeQueryResponse(response)) => {
                let _ = self.event_tx.send(BridgeClientEvent::NodeQueryResponse(response)).await;
            }
            Err(_) => {
                warn!(data = %message.payload.data, "unrecognised system message, dropping");
            }
        }
    }

    /// Sends a USER_MESSAGE.
    pub async fn send_user_message(
        &self,
        target: StationId,
        from_node: NodeId,
        to_node: NodeId,
        text: String,
        priority: Priority,
    ) -> TransportResult<()> {
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            target,
            from_node,
            to_node,
            PayloadType::UserMessage,
            text,
            BridgeMessageOptions {
                priority: Some(priority),
                ..BridgeMessageOptions::default()
            },
        );
        self.transport.send_message(&envelope).await
    }

    /// Sends a COMMAND.
    pub async fn send_command(
        &self,
        target: StationId,
        from_node: NodeId,
        to_node: NodeId,
        command: String,
        priority: Priority,
    ) -> TransportResult<()> {
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            target,
            from_node,
            to_node,
            PayloadType::Command,
            command,
            BridgeMessageOptions {
                priority: Some(priority),
                ..BridgeMessageOptions::default()
            },
        );
        self.transport.send_message(&envelope).await
    }

    /// Broadcasts a USER_MESSAGE to every currently connected station.
    pub async fn broadcast_message(&self, text: String, priority: Priority) {
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            StationId::new("ALL").expect("ALL is a valid station id"),
            NodeId(0),
            NodeId(0),
            PayloadType::UserMessage,
            text,
            BridgeMessageOptions {
                priority: Some(priority),
                ..BridgeMessageOptions::default()
            },
        );
        self.transport.broadcast(&envelope).await;
    }

    /// Broadcasts this station's node list to every currently connected
    /// station.
    pub async fn broadcast_node_discovery(&self, nodes: Vec<bth_bridge_protocol::DiscoveredNode>) {
        let payload = NodeDiscoveryPayload {
            nodes,
            station_id: self.local_station.clone(),
            timestamp: now_ms(),
        };
        let data = match serde_json::to_string(&payload) {
            Ok(data) => data,
            Err(err) => {
                warn!(%err, "failed to serialize node discovery payload");
                return;
            }
        };
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            StationId::new("ALL").expect("ALL is a valid station id"),
            NodeId(0),
            NodeId(0),
            PayloadType::NodeDiscovery,
            data,
            BridgeMessageOptions::default(),
        );
        self.transport.broadcast(&envelope).await;
    }

    /// Broadcasts a registry sync payload to every currently connected
    /// station.
    pub async fn broadcast_registry_sync(&self, payload: RegistrySyncPayload) {
        let data = match serde_json::to_string(&payload) {
            Ok(data) => data,
            Err(err) => {
                warn!(%err, "failed to serialize registry sync payload");
                return;
            }
        };
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            StationId::new("ALL").expect("ALL is a valid station id"),
            NodeId(0),
            NodeId(0),
            PayloadType::NodeRegistrySync,
            data,
            BridgeMessageOptions::default(),
        );
        self.transport.broadcast(&envelope).await;
    }

    async fn send_node_discovery(&self, target: StationId, payload: NodeDiscoveryPayload) -> TransportResult<()> {
        let data = serde_json::to_string(&payload).unwrap_or_default();
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            target,
            NodeId(0),
            NodeId(0),
            PayloadType::NodeDiscovery,
            data,
            BridgeMessageOptions::default(),
        );
        self.transport.send_message(&envelope).await
    }

    /// Sends this station's info to `target`.
    pub async fn send_station_info(&self, target: StationId, info: StationInfoPayload) -> TransportResult<()> {
        let data = serde_json::to_string(&info).unwrap_or_default();
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            target,
            NodeId(0),
            NodeId(0),
            PayloadType::StationInfo,
            data,
            BridgeMessageOptions::default(),
        );
        self.transport.send_message(&envelope).await
    }

    /// Sends a heartbeat to `target`.
    pub async fn send_heartbeat(&self, target: StationId) -> TransportResult<()> {
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            target,
            NodeId(0),
            NodeId(0),
            PayloadType::Heartbeat,
            String::new(),
            BridgeMessageOptions {
                requires_ack: Some(false),
                ..BridgeMessageOptions::default()
            },
        );
        self.transport.send_message(&envelope).await
    }

    /// Sends a SYSTEM message with an opaque `payload` body.
    pub async fn send_system_message(&self, target: StationId, payload: String) -> TransportResult<()> {
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            target,
            NodeId(0),
            NodeId(0),
            PayloadType::System,
            payload,
            BridgeMessageOptions::default(),
        );
        self.transport.send_message(&envelope).await
    }

    /// Asks `target` to send back its current station info.
    pub async fn request_station_info(&self, target: StationId) -> TransportResult<()> {
        let data = serde_json::to_string(&SystemRequest::RequestStationInfo).unwrap_or_default();
        self.send_system_message(target, data).await
    }

    /// Asks `target` to send back its current node list.
    pub async fn request_node_discovery(&self, target: StationId) -> TransportResult<()> {
        let data = serde_json::to_string(&SystemRequest::RequestNodeDiscovery).unwrap_or_default();
        self.send_system_message(target, data).await
    }

    /// Broadcasts a targeted node query to every currently connected
    /// station.
    pub async fn broadcast_node_query(&self, query: bth_registry::NodeQueryMessage) {
        let data = serde_json::to_string(&SystemRequest::NodeQuery(query)).unwrap_or_default();
        let envelope = BridgeMessage::new(
            self.local_station.clone(),
            StationId::new("ALL").expect("ALL is a valid station id"),
            NodeId(0),
            NodeId(0),
            PayloadType::System,
            data,
            BridgeMessageOptions::default(),
        );
        self.transport.broadcast(&envelope).await;
    }

    /// Replies to `target`'s targeted node query.
    pub async fn send_node_query_response(
        &self,
        target: StationId,
        response: bth_registry::NodeQueryResponse,
    ) -> TransportResult<()> {
        let data = serde_json::to_string(&SystemRequest::NodeQueryResponse(response)).unwrap_or_default();
        self.send_system_message(target, data).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    use tokio::sync::RwLock;
    use tokio::time::timeout;

    use bth_connection_manager::{ConnectionManager, ConnectionManagerConfig};
    use bth_transport::PeerInfoResolver;

    use super::*;

    /// Resolves every known station to `127.0.0.1:<port>`, as if their
    /// contact envelopes had already been opened.
    struct StaticResolver {
        peers: RwLock<HashMap<StationId, u16>>,
    }

    impl StaticResolver {
        fn new() -> Arc<Self> {
            Arc::new(Self { peers: RwLock::new(HashMap::new()) })
        }

        async fn add(&self, station_id: StationId, port: u16) {
            self.peers.write().await.insert(station_id, port);
        }
    }

    impl PeerInfoResolver for StaticResolver {
        fn resolve<'a>(
            &'a self,
            station_id: &'a StationId,
        ) -> Pin<Box<dyn Future<Output = Option<(String, u16)>> + Send + 'a>> {
            Box::pin(async move {
                self.peers.read().await.get(station_id).map(|port| ("127.0.0.1".to_string(), *port))
            })
        }
    }

    fn no_op_providers() -> BridgeClientProviders {
        BridgeClientProviders {
            station_info: Arc::new(|| unreachable!("not exercised by this scenario")),
            local_nodes: Arc::new(|| unreachable!("not exercised by this scenario")),
        }
    }

    async fn station(port: u16, resolver: Arc<StaticResolver>) -> (Arc<BridgeClient>, mpsc::Receiver<BridgeClientEvent>) {
        let config = ConnectionManagerConfig { listen_port: port, ..ConnectionManagerConfig::default() };
        let (connection_manager, event_rx) = ConnectionManager::new(config);
        connection_manager.listen_tcp().unwrap();
        let transport = Transport::new(connection_manager, resolver, TransportConfig::default());
        transport.clone().spawn_event_loop(event_rx);
        let client = BridgeClient::new(transport, StationId::new(format!("station-{port}")).unwrap(), no_op_providers()).await;
        // Give the listener a moment to bind before any peer tries to dial it.
        tokio::time::sleep(Duration::from_millis(30)).await;
        client
    }

    #[tokio::test]
    async fn user_message_is_delivered_to_the_target_station() {
        let resolver = StaticResolver::new();
        let (alpha, _alpha_events) = station(29101, resolver.clone()).await;
        let (_beta, mut beta_events) = station(29102, resolver.clone()).await;

        let alpha_id = StationId::new("station-29101").unwrap();
        let beta_id = StationId::new("station-29102").unwrap();
        resolver.add(alpha_id, 29101).await;
        resolver.add(beta_id.clone(), 29102).await;

        alpha
            .send_user_message(beta_id.clone(), NodeId(1), NodeId(2), "hello".into(), Priority::Normal)
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(2), beta_events.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        assert_eq!(
            event,
            BridgeClientEvent::UserMessage {
                from_station: StationId::new("station-29101").unwrap(),
                from_node: NodeId(1),
                to_node: NodeId(2),
                text: "hello".into(),
            }
        );
    }
}
