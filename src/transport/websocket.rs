//! WebSocket game endpoint
//!
//! One task per connection. The task owns the socket, forwards everything the
//! relay puts in its outbox, and hands parsed frames to the session server.

use crate::protocol::MessageUtils;
use crate::session::{ChannelOutbox, SessionServer};
use crate::types::ParticipantId;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Router serving the game socket at `path`
pub fn game_routes(path: &str, server: Arc<SessionServer>) -> Router {
    Router::new()
        .route(path, get(game_socket_handler))
        .with_state(server)
}

async fn game_socket_handler(
    ws: WebSocketUpgrade,
    State(server): State<Arc<SessionServer>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(server, socket))
}

/// Drive one connection until either side closes it
pub async fn handle_socket(server: Arc<SessionServer>, mut socket: WebSocket) {
    let (outbox, mut outbound) = ChannelOutbox::channel();
    let id = match server.connect(Arc::new(outbox)) {
        Ok(id) => id,
        Err(e) => {
            error!("Failed to register connection: {}", e);
            return;
        }
    };

    loop {
        tokio::select! {
            Some(message) = outbound.recv() => {
                let text = match MessageUtils::encode_server_message(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Dropping unencodable message for {}: {}", id, e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    debug!("Send to {} failed; closing", id);
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(&server, id, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("Socket error for {}: {}", id, e);
                        break;
                    }
                    // Binary frames and pings carry nothing for us
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    if let Err(e) = server.disconnect(id).await {
        warn!("Cleanup after {} failed: {}", id, e);
    }
    info!("Connection {} closed", id);
}

/// Parse one text frame and dispatch it; malformed frames are rejected back
/// to the sender
pub async fn handle_text_frame(server: &SessionServer, id: ParticipantId, text: &str) {
    match MessageUtils::parse_client_message(text) {
        Ok(message) => {
            // Failures were already reported to the sender
            let _ = server.handle_message(id, message).await;
        }
        Err(e) => server.reject(id, &e).await,
    }
}
