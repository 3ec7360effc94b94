//! # Ghostbus WebSocket Server
//!
//! Streams enriched detection records to dashboard clients in real time.
//! Each client gets its own bounded delivery buffer from the hub; the
//! detection pipeline never waits on a slow connection.
//!
//! ## Protocol
//!
//! Server -> Client: one JSON-encoded `EnrichedRecord` per message. The
//! record's field names are a stable contract for dashboard consumers.
//! Client -> Server: nothing expected; ping/pong and close frames are
//! honored, everything else is ignored.

pub mod error;
pub mod hub;

pub use error::{WsError, WsResult};
pub use hub::BroadcastHub;

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info};

/// Accept subscriber connections until shutdown is signalled.
pub async fn start_server(
    hub: Arc<BroadcastHub>,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> WsResult<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("WebSocket server listening on ws://{}", addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let hub = hub.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(hub, stream, addr, shutdown).await {
                                error!("WebSocket connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept WebSocket connection: {}", e);
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("WebSocket server shutting down");
                    return Ok(());
                }
            }
        }
    }
}

/// Drive a single subscriber connection: forward records from its hub
/// buffer to the socket, watch the read side for close frames, and clean
/// the registration up on the way out.
async fn handle_connection(
    hub: Arc<BroadcastHub>,
    stream: TcpStream,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> WsResult<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (client_id, mut records) = hub.subscribe();
    info!("Subscriber {} connected from {}", client_id, addr);

    loop {
        tokio::select! {
            record = records.recv() => {
                match record {
                    Some(payload) => {
                        if let Err(e) = ws_sender.send(Message::Text(payload.into())).await {
                            debug!("Failed to send to subscriber {}: {}", client_id, e);
                            break;
                        }
                    }
                    // The hub dropped this subscriber (slow consumer)
                    None => {
                        debug!("Subscriber {} buffer closed by hub", client_id);
                        break;
                    }
                }
            }
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Subscriber {} sent close frame", client_id);
                        break;
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pong is handled automatically by tungstenite
                    }
                    Some(Ok(_)) => {
                        debug!("Ignoring unexpected message from {}", client_id);
                    }
                    Some(Err(e)) => {
                        debug!("Error receiving from subscriber {}: {}", client_id, e);
                        break;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    hub.unsubscribe(client_id);
    info!("Subscriber {} disconnected", client_id);

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_creation() {
        let hub = BroadcastHub::default();
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_server() {
        let hub = Arc::new(BroadcastHub::default());
        let (tx, rx) = watch::channel(false);

        let server = tokio::spawn(start_server(hub, 0, rx));
        tx.send(true).unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), server).await;
        assert!(result.is_ok());
    }
}
