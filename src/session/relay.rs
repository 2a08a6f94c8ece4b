//! Outbound delivery to connected participants
//!
//! Delivery is send-and-forget: nothing is buffered beyond the connection's
//! own channel and nothing is retried.

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::types::ParticipantId;
use crate::utils::generate_participant_id;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Trait for delivering messages to one connection
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Hand a message to the connection; fails once the connection is gone
    async fn deliver(&self, message: ServerMessage) -> Result<(), GameError>;
}

/// Outbox backed by the connection worker's channel
#[derive(Debug, Clone)]
pub struct ChannelOutbox {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelOutbox {
    pub fn new(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { tx }
    }

    /// Create an outbox together with the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Outbox for ChannelOutbox {
    async fn deliver(&self, message: ServerMessage) -> Result<(), GameError> {
        self.tx
            .send(message)
            .map_err(|e| GameError::InternalError {
                message: format!("connection closed, dropped {}", e.0.kind()),
            })
    }
}

/// Directory of live connections and their outboxes
#[derive(Default)]
pub struct RelayHub {
    outboxes: RwLock<HashMap<ParticipantId, Arc<dyn Outbox>>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and mint its participant id
    pub fn register(&self, outbox: Arc<dyn Outbox>) -> Result<ParticipantId, GameError> {
        let id = generate_participant_id();
        self.outboxes
            .write()
            .map_err(|_| GameError::lock_poisoned("relay"))?
            .insert(id, outbox);
        Ok(id)
    }

    /// Forget a connection. Returns whether it was registered.
    pub fn unregister(&self, id: ParticipantId) -> Result<bool, GameError> {
        Ok(self
            .outboxes
            .write()
            .map_err(|_| GameError::lock_poisoned("relay"))?
            .remove(&id)
            .is_some())
    }

    pub fn is_connected(&self, id: ParticipantId) -> bool {
        self.outboxes
            .read()
            .map(|outboxes| outboxes.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn connection_count(&self) -> usize {
        self.outboxes
            .read()
            .map(|outboxes| outboxes.len())
            .unwrap_or(0)
    }

    pub fn is_poisoned(&self) -> bool {
        self.outboxes.is_poisoned()
    }

    /// Deliver to one participant
    pub async fn deliver(&self, id: ParticipantId, message: ServerMessage) -> Result<(), GameError> {
        let outbox = self
            .outboxes
            .read()
            .map_err(|_| GameError::lock_poisoned("relay"))?
            .get(&id)
            .cloned();

        match outbox {
            Some(outbox) => {
                debug!("Delivering {} to {}", message.kind(), id);
                outbox.deliver(message).await
            }
            None => Err(GameError::InternalError {
                message: format!("participant {} is not connected", id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_to_registered_connection() {
        let hub = RelayHub::new();
        let (outbox, mut rx) = ChannelOutbox::channel();
        let id = hub.register(Arc::new(outbox)).unwrap();

        hub.deliver(id, ServerMessage::OpponentMoved { row: 1, col: 2 })
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::OpponentMoved { row: 1, col: 2 })
        );
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_delivery_fails_after_close() {
        let hub = RelayHub::new();
        let (outbox, rx) = ChannelOutbox::channel();
        let id = hub.register(Arc::new(outbox)).unwrap();

        drop(rx);
        assert!(hub.deliver(id, ServerMessage::MatchEndedByPeer).await.is_err());

        assert!(hub.unregister(id).unwrap());
        assert!(!hub.unregister(id).unwrap());
        assert!(!hub.is_connected(id));
        assert!(hub.deliver(id, ServerMessage::MatchEndedByPeer).await.is_err());
    }
}
