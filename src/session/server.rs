//! Per-connection event handling
//!
//! The session server glues the queue, the registry and the relay together.
//! It never runs a board: moves are forwarded as raw coordinates and each
//! participant judges the game on its own board. Turn order is not checked
//! here either.
//!
//! No two of the shared structures are ever locked at the same time. Pairing
//! drains the queue under its lock, then registers the match under the
//! registry's lock.

use crate::board::Position;
use crate::error::GameError;
use crate::metrics::{MatchEndReason, MetricsCollector};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::queue::MatchmakingQueue;
use crate::session::registry::SessionRegistry;
use crate::session::relay::{Outbox, RelayHub};
use crate::types::{ConnectionState, MatchId, ParticipantId};
use crate::utils::first_arrival_moves_first;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Snapshot of server activity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionServerStats {
    pub connections: usize,
    pub players_waiting: usize,
    pub active_matches: usize,
    pub matches_created: u64,
    pub matches_ended: u64,
    pub moves_relayed: u64,
}

/// Entry point for every connection worker
#[derive(Clone)]
pub struct SessionServer {
    queue: Arc<MatchmakingQueue>,
    registry: Arc<SessionRegistry>,
    relay: Arc<RelayHub>,
    metrics_collector: Arc<MetricsCollector>,
}

impl SessionServer {
    /// Create a session server over the given shared structures
    pub fn new(
        queue: Arc<MatchmakingQueue>,
        registry: Arc<SessionRegistry>,
        relay: Arc<RelayHub>,
    ) -> Self {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(queue, registry, relay, metrics_collector)
    }

    /// Create a session server with metrics collector
    pub fn with_metrics(
        queue: Arc<MatchmakingQueue>,
        registry: Arc<SessionRegistry>,
        relay: Arc<RelayHub>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            queue,
            registry,
            relay,
            metrics_collector,
        }
    }

    /// Register a new connection; it starts `Idle`
    pub fn connect(&self, outbox: Arc<dyn Outbox>) -> Result<ParticipantId, GameError> {
        let id = self.relay.register(outbox)?;
        self.metrics_collector.record_connection_opened();
        info!("Participant {} connected", id);
        Ok(id)
    }

    /// Current state of a connection, derived from the shared structures
    pub fn connection_state(&self, id: ParticipantId) -> ConnectionState {
        if !self.relay.is_connected(id) {
            ConnectionState::Closed
        } else if self.registry.match_of(id).is_some() {
            ConnectionState::InMatch
        } else if self.queue.contains(id) {
            ConnectionState::Queued
        } else {
            ConnectionState::Idle
        }
    }

    /// Dispatch one inbound message. Failures are reported to the sender only.
    pub async fn handle_message(
        &self,
        id: ParticipantId,
        message: ClientMessage,
    ) -> Result<(), GameError> {
        let timer = self.metrics_collector.start_timer();

        let result = match message {
            ClientMessage::JoinQueue => self.join_queue(id).await.map(|_| ()),
            ClientMessage::MovePlaced { row, col } => self.move_placed(id, row, col).await,
            ClientMessage::EndMatch => self.end_match(id).await.map(|_| ()),
        };

        if let Err(e) = &result {
            self.reject(id, e).await;
        }

        self.metrics_collector.record_message_processed(timer.stop());
        result
    }

    /// `Idle → Queued`, pairing immediately when an opponent is waiting.
    ///
    /// A no-op for connections that are already queued, in a match, or closed.
    pub async fn join_queue(&self, id: ParticipantId) -> Result<ConnectionState, GameError> {
        let state = self.connection_state(id);
        if state != ConnectionState::Idle {
            debug!("Ignoring join from {} in state {}", id, state);
            return Ok(state);
        }

        self.queue.enqueue(id)?;
        info!("Participant {} joined the queue", id);

        // A pair that loses a race goes back to the queue, so keep pairing
        while let Some((first, second)) = self.queue.try_pair_oldest()? {
            self.start_match(first, second).await?;
        }
        self.metrics_collector.set_queue_length(self.queue.len());

        Ok(self.connection_state(id))
    }

    /// Register a popped pair and announce it. Returns `None` when one side
    /// was matched elsewhere in the meantime; the other side is queued again.
    async fn start_match(
        &self,
        first: ParticipantId,
        second: ParticipantId,
    ) -> Result<Option<MatchId>, GameError> {
        let match_id = match self.registry.create_match(first, second) {
            Ok(match_id) => match_id,
            Err(GameError::AlreadyInMatch { participant_id }) => {
                warn!(
                    "Pairing of {} and {} lost a race: {} is already matched",
                    first, second, participant_id
                );
                self.return_to_queue(first, second)?;
                return Ok(None);
            }
            Err(e) => {
                error!("Could not register match for {} and {}: {}", first, second, e);
                self.return_to_queue(first, second)?;
                return Err(e);
            }
        };

        // A join handled between draining the queue and registering the match
        // may have queued either side again.
        self.queue.remove(first)?;
        self.queue.remove(second)?;

        self.metrics_collector
            .record_match_started(self.registry.active_matches());

        let first_goes_first = first_arrival_moves_first();
        info!(
            "Match {} started: {} vs {}, {} moves first",
            match_id,
            first,
            second,
            if first_goes_first { first } else { second }
        );

        // Both sides hear about the start before either hears about an end
        let mut unreachable = Vec::new();
        for (participant, goes_first) in [(first, first_goes_first), (second, !first_goes_first)]
        {
            let started = ServerMessage::MatchStarted { goes_first };
            if let Err(e) = self.relay.deliver(participant, started).await {
                warn!("Could not notify {} of match start: {}", participant, e);
                self.metrics_collector.record_delivery_failure();
                unreachable.push(participant);
            }
        }
        for participant in unreachable {
            self.disconnect(participant).await?;
        }

        Ok(Some(match_id))
    }

    /// Put the unmatched, still connected members of a failed pair back at the
    /// head of the queue in their original order
    fn return_to_queue(&self, first: ParticipantId, second: ParticipantId) -> Result<(), GameError> {
        for id in [second, first] {
            if self.relay.is_connected(id) && self.registry.match_of(id).is_none() {
                self.queue.requeue_front(id)?;
                debug!("Returned {} to the queue", id);
            }
        }
        self.metrics_collector.set_queue_length(self.queue.len());
        Ok(())
    }

    /// Forward a move to the peer. The relay carries raw coordinates only.
    pub async fn move_placed(
        &self,
        id: ParticipantId,
        row: i32,
        col: i32,
    ) -> Result<(), GameError> {
        Position::try_new(row, col)?;

        if self.registry.match_of(id).is_none() {
            return Err(GameError::NotInMatch);
        }

        let Some(peer) = self.registry.other_participant(id) else {
            // The peer already ended its side; nobody is listening.
            debug!("Dropping move from {}: peer has left the match", id);
            return Ok(());
        };

        match self
            .relay
            .deliver(peer, ServerMessage::OpponentMoved { row, col })
            .await
        {
            Ok(()) => {
                debug!("Relayed ({}, {}) from {} to {}", row, col, id, peer);
                self.metrics_collector.record_move_relayed();
            }
            Err(e) => {
                warn!("Relay to {} failed, treating as disconnect: {}", peer, e);
                self.metrics_collector.record_delivery_failure();
                self.disconnect(peer).await?;
            }
        }
        Ok(())
    }

    /// `InMatch → Idle` for the caller only; the peer is not notified.
    pub async fn end_match(&self, id: ParticipantId) -> Result<Option<MatchId>, GameError> {
        match self.registry.leave_match_with_status(id)? {
            Some((match_id, closed)) => {
                info!("Participant {} ended match {}", id, match_id);
                if closed {
                    self.metrics_collector.record_match_ended(
                        MatchEndReason::Explicit,
                        self.registry.active_matches(),
                    );
                }
                Ok(Some(match_id))
            }
            None => {
                debug!("End request from {} outside a match", id);
                Ok(None)
            }
        }
    }

    /// `* → Closed`. Leaves the queue, ends any match, and tells the
    /// surviving peer exactly once.
    pub async fn disconnect(&self, id: ParticipantId) -> Result<(), GameError> {
        if self.relay.unregister(id)? {
            self.metrics_collector.record_connection_closed();
            info!("Participant {} disconnected", id);
        }

        if self.queue.remove(id)? {
            debug!("Removed {} from the queue", id);
            self.metrics_collector.set_queue_length(self.queue.len());
        }

        let Some((match_id, peer)) = self.registry.end_match_with_peer(id)? else {
            return Ok(());
        };
        self.metrics_collector
            .record_match_ended(MatchEndReason::Disconnect, self.registry.active_matches());

        if let Some(peer) = peer {
            info!(
                "Match {} ended by disconnect of {}; notifying {}",
                match_id, id, peer
            );
            match self.relay.deliver(peer, ServerMessage::MatchEndedByPeer).await {
                Ok(()) => self.metrics_collector.record_forced_end(),
                Err(e) => {
                    // The peer's own worker cleans up after it.
                    debug!("Peer {} already gone: {}", peer, e);
                    self.metrics_collector.record_delivery_failure();
                }
            }
        }
        Ok(())
    }

    /// Tell `id` its request failed; nobody else hears about it
    pub async fn reject(&self, id: ParticipantId, error: &GameError) {
        debug!("Rejecting request from {}: {}", id, error);
        self.metrics_collector.record_rejection(error.kind());

        let rejected = ServerMessage::Rejected {
            reason: error.to_string(),
        };
        if let Err(e) = self.relay.deliver(id, rejected).await {
            debug!("Could not deliver rejection to {}: {}", id, e);
        }
    }

    pub fn stats(&self) -> SessionServerStats {
        let registry_stats = self.registry.stats();
        SessionServerStats {
            connections: self.relay.connection_count(),
            players_waiting: self.queue.len(),
            active_matches: registry_stats.active_matches,
            matches_created: registry_stats.matches_created,
            matches_ended: registry_stats.matches_ended,
            moves_relayed: self.metrics_collector.relay().moves_relayed_total.get(),
        }
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    pub fn queue(&self) -> Arc<MatchmakingQueue> {
        self.queue.clone()
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    pub fn relay(&self) -> Arc<RelayHub> {
        self.relay.clone()
    }
}
