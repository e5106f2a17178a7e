use std::fmt;

use dashmap::DashMap;
use game_types::ServerMessage;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("connection not found")]
    NotFound,
    #[error("connection closed")]
    Closed,
}

/// Outbound channels of every open socket.
///
/// Sending never blocks: each connection drains its own unbounded channel in
/// its writer task.
#[derive(Default)]
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_connection(&self, id: ConnectionId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.connections.insert(id, sender);
        receiver
    }

    pub fn remove_connection(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    pub fn send_to_connection(&self, id: ConnectionId, message: ServerMessage) -> Result<(), SendError> {
        let sender = self
            .connections
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(SendError::NotFound)?;
        sender.send(message).map_err(|_| SendError::Closed)
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
