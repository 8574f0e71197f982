//! Subscription broadcaster for real-time alert delivery
//!
//! Tracks connected clients and their channel subscriptions, and fans
//! events out to every subscriber of a channel. The core is transport
//! agnostic: each client is a bounded mpsc queue, and the WebSocket pump in
//! `handlers::ws` forwards that queue to the socket. Slow or gone clients
//! are skipped, never awaited.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::constants::broadcaster::OUTBOUND_BUFFER;

/// Identity of a connected client, unique for the process lifetime
pub type ClientId = u64;

/// Messages queued toward a client
#[derive(Clone, Debug)]
pub enum OutboundMessage {
    /// Welcome message carrying the assigned client id
    Connected { client_id: ClientId },
    /// Subscription acknowledged
    Subscribed { channel: String },
    /// Unsubscription acknowledged
    Unsubscribed { channel: String },
    /// A broadcast event on a subscribed channel
    Event { channel: String, data: Value },
}

impl OutboundMessage {
    /// Wire shape; the event type tag is the channel name itself
    pub fn to_json(&self) -> Value {
        match self {
            OutboundMessage::Connected { client_id } => {
                json!({"type": "connected", "data": {"clientId": client_id}})
            }
            OutboundMessage::Subscribed { channel } => {
                json!({"type": "subscribed", "channel": channel})
            }
            OutboundMessage::Unsubscribed { channel } => {
                json!({"type": "unsubscribed", "channel": channel})
            }
            OutboundMessage::Event { channel, data } => {
                json!({"type": channel, "data": data})
            }
        }
    }
}

/// Inbound client message, `{"type": "...", "channel": "..."}`
#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
}

struct ClientHandle {
    tx: mpsc::Sender<OutboundMessage>,
    subscriptions: RwLock<HashSet<String>>,
}

/// Connected-client registry with per-channel fan-out
pub struct Broadcaster {
    clients: DashMap<ClientId, ClientHandle>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new client with an empty subscription set.
    ///
    /// Returns the client id and the receiving end of its outbound queue;
    /// the welcome message is already queued. Dropping the receiver without
    /// calling `disconnect` leaves the handle behind, so the transport layer
    /// must pair every `register` with a `disconnect`.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<OutboundMessage>) {
        let client_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);

        // Freshly created queue, the welcome always fits
        let _ = tx.try_send(OutboundMessage::Connected { client_id });

        self.clients.insert(
            client_id,
            ClientHandle {
                tx,
                subscriptions: RwLock::new(HashSet::new()),
            },
        );

        tracing::info!(client_id, total = self.clients.len(), "Broadcast client connected");
        (client_id, rx)
    }

    /// Handle a raw inbound message from a client.
    ///
    /// Malformed JSON and unknown message types are logged and ignored; the
    /// connection stays open either way.
    pub fn handle_message(&self, client_id: ClientId, raw: &str) {
        let message: ClientMessage = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(client_id, error = %e, "Ignoring malformed client message");
                return;
            }
        };

        match message.kind.as_str() {
            "subscribe" => self.subscribe(client_id, message.channel),
            "unsubscribe" => self.unsubscribe(client_id, message.channel),
            other => {
                tracing::debug!(client_id, message_type = %other, "Ignoring unknown message type");
            }
        }
    }

    fn subscribe(&self, client_id: ClientId, channel: Option<String>) {
        let Some(channel) = channel.filter(|c| !c.is_empty()) else {
            tracing::warn!(client_id, "Subscribe without a channel, ignoring");
            return;
        };

        if let Some(handle) = self.clients.get(&client_id) {
            handle.subscriptions.write().insert(channel.clone());
            tracing::debug!(client_id, channel = %channel, "Client subscribed");
            Self::queue(&handle, OutboundMessage::Subscribed { channel }, client_id);
        }
    }

    fn unsubscribe(&self, client_id: ClientId, channel: Option<String>) {
        let Some(channel) = channel.filter(|c| !c.is_empty()) else {
            tracing::warn!(client_id, "Unsubscribe without a channel, ignoring");
            return;
        };

        if let Some(handle) = self.clients.get(&client_id) {
            handle.subscriptions.write().remove(&channel);
            tracing::debug!(client_id, channel = %channel, "Client unsubscribed");
            Self::queue(&handle, OutboundMessage::Unsubscribed { channel }, client_id);
        }
    }

    /// Remove a client. Dropping its sender ends the transport forward task.
    pub fn disconnect(&self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_some() {
            tracing::info!(client_id, total = self.clients.len(), "Broadcast client disconnected");
        }
    }

    /// Deliver an event to every client subscribed to the channel.
    ///
    /// Fire and forget: clients whose queue is full or closed are skipped.
    /// Returns the number of clients the event was queued for.
    pub fn broadcast(&self, channel: &str, data: Value) -> usize {
        let mut delivered = 0;

        for entry in self.clients.iter() {
            if !entry.subscriptions.read().contains(channel) {
                continue;
            }

            let message = OutboundMessage::Event {
                channel: channel.to_string(),
                data: data.clone(),
            };
            match entry.tx.try_send(message) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(client_id = *entry.key(), channel = %channel, "Client queue full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(client_id = *entry.key(), channel = %channel, "Client queue closed, dropping event");
                }
            }
        }

        tracing::debug!(channel = %channel, delivered, "Broadcast complete");
        delivered
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn queue(handle: &ClientHandle, message: OutboundMessage, client_id: ClientId) {
        if handle.tx.try_send(message).is_err() {
            tracing::debug!(client_id, "Client queue unwritable, dropping ack");
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
