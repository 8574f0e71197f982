//! WebSocket handler for real-time alert delivery
//!
//! Bridges a socket to the broadcaster: the client is registered on upgrade,
//! inbound text frames become subscribe/unsubscribe commands, and queued
//! outbound messages are forwarded until either side closes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use super::health::AppState;

/// WebSocket upgrade handler
///
/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (client_id, mut rx) = state.broadcaster.register();
    tracing::debug!(client_id, "WebSocket client connected");

    // Task to forward queued messages to the client
    let send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let msg = Message::Text(outbound.to_json().to_string());
            if sender.send(msg).await.is_err() {
                // Client disconnected
                break;
            }
        }
    });

    // Task to feed client frames into the broadcaster
    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    recv_state.broadcaster.handle_message(client_id, &text);
                }
                Message::Ping(_) => {
                    // Pong is automatically sent by axum
                }
                Message::Close(_) => {
                    tracing::debug!(client_id, "Client requested close");
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = send_task => {
            tracing::debug!(client_id, "Send task finished");
        }
        _ = recv_task => {
            tracing::debug!(client_id, "Receive task finished");
        }
    }

    // Dropping the handle ends the other task's channel
    state.broadcaster.disconnect(client_id);
    tracing::debug!(client_id, "WebSocket connection closed");
}
