//! WebSocket transport for the gateway.

use super::Gateway;
use crate::http::AppState;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Upgrades `GET /ws` to a participant connection.
#[instrument(skip_all)]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    debug!("WebSocket upgrade requested");
    let gateway = Arc::clone(state.gateway());
    ws.on_upgrade(move |socket| serve_socket(socket, gateway))
}

/// Pumps one connection until either side closes it.
async fn serve_socket(socket: WebSocket, gateway: Arc<Gateway>) {
    let (participant, mut outbox) = gateway.connect();
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbox.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Failed to encode server event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        // Best effort; the peer may already be gone.
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => gateway.handle_frame(participant, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(%participant, error = %e, "WebSocket receive failed");
                break;
            }
        }
    }

    // Dropping the peer closes its outbox, which ends the writer.
    gateway.disconnect(participant);
    if let Err(e) = writer.await {
        warn!(%participant, error = %e, "Writer task failed");
    }
    info!(%participant, "Connection closed");
}
