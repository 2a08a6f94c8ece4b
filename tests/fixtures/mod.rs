//! Test fixtures and in-memory outboxes for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use gomoku_relay::client::{ParticipantMatch, ParticipantUpdate};
use gomoku_relay::error::GameError;
use gomoku_relay::protocol::{ClientMessage, ServerMessage};
use gomoku_relay::session::{
    ChannelOutbox, MatchmakingQueue, Outbox, RelayHub, SessionRegistry, SessionServer,
};
use gomoku_relay::types::ParticipantId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

/// Outbox that records every delivered message
#[derive(Debug, Default)]
pub struct RecordingOutbox {
    messages: Mutex<Vec<ServerMessage>>,
    closed: AtomicBool,
}

impl RecordingOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox whose connection is already gone
    pub fn closed() -> Self {
        let outbox = Self::new();
        outbox.close();
        outbox
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<ServerMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Count messages of a given kind (see [`ServerMessage::kind`])
    pub fn count_of(&self, kind: &str) -> usize {
        self.messages()
            .iter()
            .filter(|message| message.kind() == kind)
            .count()
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn deliver(&self, message: ServerMessage) -> Result<(), GameError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GameError::InternalError {
                message: "outbox closed".to_string(),
            });
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
        Ok(())
    }
}

/// Fresh server over empty shared structures
pub fn create_test_server() -> Arc<SessionServer> {
    Arc::new(SessionServer::new(
        Arc::new(MatchmakingQueue::new()),
        Arc::new(SessionRegistry::new()),
        Arc::new(RelayHub::new()),
    ))
}

/// A connected participant driving its own board from relayed messages
pub struct TestPlayer {
    pub id: ParticipantId,
    pub game: ParticipantMatch,
    rx: UnboundedReceiver<ServerMessage>,
}

impl TestPlayer {
    pub fn connect(server: &SessionServer) -> Self {
        let (outbox, rx) = ChannelOutbox::channel();
        let id = server.connect(Arc::new(outbox)).unwrap();
        Self {
            id,
            game: ParticipantMatch::new(),
            rx,
        }
    }

    /// Apply everything the server has sent so far
    pub fn pump(&mut self) -> Vec<Result<ParticipantUpdate, GameError>> {
        let mut updates = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            updates.push(self.game.apply(message));
        }
        updates
    }

    pub async fn send(
        &self,
        server: &SessionServer,
        message: ClientMessage,
    ) -> Result<(), GameError> {
        server.handle_message(self.id, message).await
    }

    /// Place locally, then announce the move
    pub async fn play(
        &mut self,
        server: &SessionServer,
        row: i32,
        col: i32,
    ) -> Result<(), GameError> {
        let message = self.game.place_local(row, col)?;
        self.send(server, message).await
    }

    /// Leave the match and start a fresh local model
    pub async fn leave(&mut self, server: &SessionServer) -> Result<(), GameError> {
        let message = self.game.end();
        self.send(server, message).await?;
        self.game = ParticipantMatch::new();
        Ok(())
    }
}

/// Connect two players and pair them; returns (first mover, second mover)
pub async fn start_match(server: &SessionServer) -> (TestPlayer, TestPlayer) {
    let mut a = TestPlayer::connect(server);
    let mut b = TestPlayer::connect(server);

    a.send(server, ClientMessage::JoinQueue).await.unwrap();
    b.send(server, ClientMessage::JoinQueue).await.unwrap();
    a.pump();
    b.pump();

    if a.game.is_our_turn() {
        (a, b)
    } else {
        (b, a)
    }
}
