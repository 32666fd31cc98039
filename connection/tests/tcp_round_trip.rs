use bth_connection_manager::{ConnectionManager, ConnectionManagerConfig, ConnectionEvent, ConnectionType, PeerKey};

fn config_on_port(port: u16) -> ConnectionManagerConfig {
    ConnectionManagerConfig {
        listen_port: port,
        max_connections: 10,
        ..ConnectionManagerConfig::default()
    }
}

#[tokio::test]
async fn tcp_frame_round_trips_between_two_managers() {
    let listen_port = 19447;
    let (server, mut server_events) = ConnectionManager::new(config_on_port(listen_port));
    server.listen_tcp().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let (client, mut client_events) = ConnectionManager::new(config_on_port(listen_port + 10));
    let peer_key = PeerKey::Station(bth_common::StationId::new("remote").unwrap());
    let handle = client
        .connect_to_peer(peer_key.clone(), "127.0.0.1", listen_port, ConnectionType::Tcp)
        .await
        .unwrap();

    // Wait for the server to observe the inbound connection.
    let server_connected = server_events.recv().await.unwrap();
    assert!(matches!(server_connected, ConnectionEvent::PeerConnected(_)));

    handle.send(b"hello bridge".to_vec()).await.unwrap();

    let mut saw_message = false;
    while let Some(event) = server_events.recv().await {
        if let ConnectionEvent::MessageReceived(bytes, _) = event {
            assert_eq!(bytes, b"hello bridge");
            saw_message = true;
            break;
        }
    }
    assert!(saw_message);

    // Drain the client's own connected event so the channel doesn't back up.
    let client_connected = client_events.recv().await.unwrap();
    assert!(matches!(client_connected, ConnectionEvent::PeerConnected(_)));
}
