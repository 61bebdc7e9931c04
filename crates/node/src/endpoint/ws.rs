use std::sync::Arc;

use axum::extract::ws::Message;
use axum::extract::ws::WebSocket;

use super::EndpointState;

/// Inbound channel of a remote process, one is spawned per connection.
/// Every text frame is an envelope for one of the hosted members.
pub async fn handle_socket(state: Arc<EndpointState>, mut socket: WebSocket, path_id: String) {
    let mut cnt = 0;
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => {
                cnt += 1;
                if let Err(e) = state
                    .processor
                    .directory
                    .deliver(Some(&path_id), &text)
                    .await
                {
                    tracing::warn!("Drop frame on /node/{}/receive: {}", path_id, e);
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(msg) => tracing::debug!("Ignore frame: {:?}", msg),
            Err(e) => {
                tracing::warn!("WS error on /node/{}/receive: {}", path_id, e);
                break;
            }
        }
    }
    tracing::debug!("WS over after {} frames", cnt);
}
