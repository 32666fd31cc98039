use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use bth_bridge_client::{BridgeClient, BridgeClientEvent, BridgeClientProviders};
use bth_bridge_protocol::{DiscoveredNode, QueueStatus, StationInfoPayload};
use bth_common::time::now_ms;
use bth_connection_manager::{ConnectionManager, ConnectionManagerConfig};
use bth_discovery::{seal_contact_info, ContactInfo, DiscoveryClient, DiscoveryConfigBuilder, DiscoveryEvent, RegisterRequest};
use bth_dispatcher::{LocalRadio, RelayDispatcher};
use bth_registry::{NodeRegistry, RegistryConfig};
use bth_transport::{PeerInfoResolver, Transport, TransportConfig};

use crate::config::StationConfig;
use crate::peer_resolver::PeerCache;
use crate::radio::ConfiguredRadio;

/// Wires every component crate together into one running station and never
/// returns under normal operation.
pub async fn run(config: StationConfig, data_dir: &Path) -> anyhow::Result<()> {
    let station_id = config.identity.station_id.clone();
    let radio = Arc::new(ConfiguredRadio::new(Vec::new()));

    let connection_config = ConnectionManagerConfig {
        listen_port: config.p2p.listen_port,
        max_connections: config.p2p.max_connections,
        ..ConnectionManagerConfig::default()
    };
    let (connection_manager, connection_events) = ConnectionManager::new(connection_config);
    connection_manager.listen_tcp()?;
    connection_manager.listen_websocket()?;
    connection_manager.spawn_keep_alive_sweep();

    let peer_cache = PeerCache::new(config.discovery.shared_key.clone());
    let resolver: Arc<dyn PeerInfoResolver> = peer_cache.clone();
    let transport = Transport::new(connection_manager, resolver, TransportConfig::default());
    transport.clone().spawn_event_loop(connection_events);

    let providers = {
        let identity = config.identity.clone();
        let station_id = station_id.clone();
        let info_radio = Arc::clone(&radio);
        let nodes_radio = Arc::clone(&radio);
        BridgeClientProviders {
            station_info: Arc::new(move || StationInfoPayload {
                station_id: station_id.clone(),
                display_name: identity.display_name.clone(),
                location: identity.location.clone(),
                operator: identity.operator.clone(),
                capabilities: identity.capabilities.clone(),
                node_count: info_radio.nodes().len() as u32,
                queue_status: QueueStatus::default(),
            }),
            local_nodes: Arc::new(move || {
                nodes_radio.nodes()
                    .into_iter()
                    .map(|node| DiscoveredNode {
                        node_id: node.node_id,
                        name: node.long_name,
                        last_seen: now_ms(),
                        signal: 0,
                    })
                    .collect()
            }),
        }
    };

    let (bridge_client, bridge_events) = BridgeClient::new(transport, station_id.clone(), providers).await;

    let registry_path = data_dir.join("registry.db");
    let (registry, registry_events) = NodeRegistry::new(
        registry_path.to_str().unwrap_or("registry.db"),
        station_id.clone(),
        RegistryConfig {
            local_testing: config.discovery.local_testing,
            ..RegistryConfig::default()
        },
    )
    .await?;
    registry.clone().spawn_timers();

    let dispatcher = RelayDispatcher::new(radio, Arc::clone(&bridge_client), Arc::clone(&registry), station_id.clone());
    dispatcher.clone().spawn_registry_event_pump(registry_events);
    spawn_bridge_event_pump(Arc::clone(&dispatcher), bridge_events);

    let discovery_config = DiscoveryConfigBuilder::new()
        .discovery_url(config.discovery.url.clone())
        .timeout_secs(config.discovery.timeout_secs)
        .check_interval_secs(config.discovery.check_interval_secs)
        .local_testing(config.discovery.local_testing)
        .build();
    let discovery_client = Arc::new(DiscoveryClient::new(discovery_config, station_id.clone())?);

    let public_ip = discovery_client.resolve_public_ip().await;
    let contact = ContactInfo {
        ip: public_ip,
        port: config.p2p.listen_port,
        public_key: config.keys.public_key_hex.clone(),
        last_seen: now_ms(),
    };
    let encrypted_contact_info = seal_contact_info(&contact, &config.discovery.shared_key)?;
    let register_request = RegisterRequest {
        station_id: station_id.clone(),
        encrypted_contact_info,
        public_key: config.keys.public_key_hex.clone(),
    };

    let (discovery_event_tx, discovery_events) = mpsc::channel(64);
    discovery_client.spawn(register_request, discovery_event_tx);
    spawn_discovery_event_pump(peer_cache, dispatcher, discovery_events);

    info!(%station_id, port = config.p2p.listen_port, "station running");
    std::future::pending::<()>().await;
    Ok(())
}

fn spawn_bridge_event_pump(dispatcher: Arc<RelayDispatcher>, mut events: mpsc::Receiver<BridgeClientEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(err) = dispatcher.handle_bridge_event(event).await {
                warn!(%err, "failed to handle bridge client event");
            }
        }
    });
}

fn spawn_discovery_event_pump(
    peer_cache: Arc<PeerCache>,
    dispatcher: Arc<RelayDispatcher>,
    mut events: mpsc::Receiver<DiscoveryEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                DiscoveryEvent::PeerDiscovered(peer) => {
                    peer_cache.insert(peer.station_id.clone(), &peer.encrypted_contact_info).await;
                    if let Err(err) = dispatcher.on_peer_discovered(peer.station_id).await {
                        warn!(%err, "failed to exchange node tables with discovered peer");
                    }
                }
                DiscoveryEvent::PeerLost(station_id) => {
                    peer_cache.remove(&station_id).await;
                    if let Err(err) = dispatcher.on_peer_lost(&station_id).await {
                        warn!(%err, "failed to purge registry rows for lost peer");
                    }
                }
            }
        }
    });
}
