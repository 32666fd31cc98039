use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ConnectionManagerConfig;
use crate::events::ConnectionEvent;
use crate::handle::{ConnectionCommand, ConnectionHandle};
use crate::transport_io::Transport;
use crate::types::ConnectionStatus;

/// Spawns the task that owns one connection: a read loop surfacing frames
/// as [`ConnectionEvent::MessageReceived`], and a command loop writing
/// outbound frames in the order they were submitted (per-connection FIFO).
pub(crate) fn spawn_connection_actor(
    mut transport: Transport,
    handle: ConnectionHandle,
    mut command_rx: mpsc::Receiver<ConnectionCommand>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    config: ConnectionManagerConfig,
) {
    tokio::spawn(async move {
        handle.set_status(ConnectionStatus::Connected).await;
        let _ = event_tx
            .send(ConnectionEvent::PeerConnected(handle.peer_key().clone()))
            .await;

        let disconnect_reason = loop {
            tokio::select! {
                biased;

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(bytes)) => {
                            if let Err(err) = transport.send_frame(bytes).await {
                                warn!(peer = %handle.peer_key(), %err, "failed to write frame");
                                break err.to_string();
                            }
                            handle.touch();
                        }
                        Some(ConnectionCommand::Close) | None => {
                            break "closed".to_string();
                        }
                    }
                }

                frame = transport.recv_frame() => {
                    match frame {
                        Some(Ok(bytes)) => {
                            handle.touch();
                            let _ = event_tx
                                .send(ConnectionEvent::MessageReceived(bytes, handle.peer_key().clone()))
                                .await;
                        }
                        Some(Err(err)) => {
                            let err = err.reclassify_frame_size(config.max_frame_bytes);
                            warn!(peer = %handle.peer_key(), %err, "connection error");
                            let _ = event_tx
                                .send(ConnectionEvent::ConnectionError(handle.peer_key().clone(), err.to_string()))
                                .await;
                            break err.to_string();
                        }
                        None => {
                            break "remote closed".to_string();
                        }
                    }
                }
            }
        };

        handle.set_status(ConnectionStatus::Disconnected).await;
        debug!(peer = %handle.peer_key(), reason = %disconnect_reason, "connection closed");
        let _ = event_tx
            .send(ConnectionEvent::PeerDisconnected(
                handle.peer_key().clone(),
                disconnect_reason,
            ))
            .await;
    });
}
