//! Outbound fan-out
//!
//! State transitions never talk to sockets directly. They queue events in an
//! [`Outbox`] while the room lock is held; the outbox is then flushed to the
//! per-connection channels before the lock is released, so every client sees
//! the events of a room in the order they were produced.

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{ConnectionId, Room};
use tokio::sync::mpsc;

/// Events queued for delivery, each with its resolved recipients
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<(Vec<ConnectionId>, ServerMessage)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for every member of the room
    pub fn to_room(&mut self, room: &Room, msg: ServerMessage) {
        let recipients = room.players.iter().map(|p| p.id.clone()).collect();
        self.envelopes.push((recipients, msg));
    }

    /// Queue an event for a single connection
    pub fn to_player(&mut self, id: &str, msg: ServerMessage) {
        self.envelopes.push((vec![id.to_string()], msg));
    }

    /// Queue a full room snapshot for every member
    pub fn room_update(&mut self, room: &Room) {
        self.to_room(room, ServerMessage::RoomUpdate(room.clone()));
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }
}

impl AppState {
    /// Register a new connection and return its id and event stream
    pub async fn open_connection(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = ulid::Ulid::new().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(id.clone(), tx);
        tracing::debug!("Connection {} registered", id);
        (id, rx)
    }

    /// Drop the outbound channel of a connection
    pub async fn close_connection(&self, id: &str) {
        self.connections.write().await.remove(id);
        tracing::debug!("Connection {} unregistered", id);
    }

    /// Deliver queued events in order
    pub async fn dispatch(&self, outbox: Outbox) {
        if outbox.is_empty() {
            return;
        }

        let connections = self.connections.read().await;
        for (recipients, msg) in outbox.envelopes {
            for id in recipients {
                match connections.get(&id) {
                    Some(tx) => {
                        let _ = tx.send(msg.clone());
                    }
                    None => tracing::debug!("Dropping event for unknown connection {}", id),
                }
            }
        }
    }
}
