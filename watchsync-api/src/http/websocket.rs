//! WebSocket endpoint carrying JSON text frames
//!
//! One task per connection drives a [`Session`]: inbound frames are
//! dispatched in arrival order, and everything queued on the session's
//! channel (room events and acks) is written out in queue order.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::http::AppState;
use crate::impls::Session;

/// Largest accepted inbound frame
const MAX_FRAME_BYTES: usize = 64 * 1024;

pub fn create_websocket_router() -> Router<AppState> {
    Router::new().route("/ws", get(websocket_handler))
}

pub async fn websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::new(state.room_service.clone(), tx);
    let connection_id = session.connection_id().clone();
    info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                // The session holds a sender, so the channel never closes here
                let Some(message) = outbound else { break };
                session.observe(&message);
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(connection_id = %connection_id, error = %e, "Failed to encode server message");
                        continue;
                    }
                };
                if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                    warn!(connection_id = %connection_id, error = %e, "Failed to send WebSocket message");
                    break;
                }
            }
            inbound = ws_stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => session.handle_frame(text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {
                    // Binary, ping and pong frames carry no commands
                }
                Some(Err(e)) => {
                    warn!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    }

    session.disconnect();
    info!(connection_id = %connection_id, "WebSocket connection closed");
}
