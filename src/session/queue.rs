//! FIFO matchmaking queue
//!
//! Participants are paired strictly in arrival order. Every operation runs
//! under one mutex so two concurrent callers can never pair the same entries.

use crate::error::GameError;
use crate::types::ParticipantId;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// Ordered queue of participants waiting for an opponent
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    waiting: Mutex<VecDeque<ParticipantId>>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless it is already waiting. Returns whether it was added.
    ///
    /// Callers must not enqueue a participant that is in a match; the session
    /// server checks the registry first.
    pub fn enqueue(&self, id: ParticipantId) -> Result<bool, GameError> {
        let mut waiting = self
            .waiting
            .lock()
            .map_err(|_| GameError::lock_poisoned("queue"))?;

        if waiting.contains(&id) {
            debug!("Participant {} already queued", id);
            return Ok(false);
        }

        waiting.push_back(id);
        debug!("Participant {} queued at position {}", id, waiting.len());
        Ok(true)
    }

    /// Remove and return the two oldest entries, earliest first
    pub fn try_pair_oldest(&self) -> Result<Option<(ParticipantId, ParticipantId)>, GameError> {
        let mut waiting = self
            .waiting
            .lock()
            .map_err(|_| GameError::lock_poisoned("queue"))?;

        if waiting.len() < 2 {
            return Ok(None);
        }

        match (waiting.pop_front(), waiting.pop_front()) {
            (Some(first), Some(second)) => Ok(Some((first, second))),
            _ => Err(GameError::InternalError {
                message: "queue shrank while locked".to_string(),
            }),
        }
    }

    /// Put `id` back at the head of the queue, ahead of later arrivals.
    /// Used when a popped pair could not be matched.
    pub fn requeue_front(&self, id: ParticipantId) -> Result<bool, GameError> {
        let mut waiting = self
            .waiting
            .lock()
            .map_err(|_| GameError::lock_poisoned("queue"))?;

        if waiting.contains(&id) {
            return Ok(false);
        }

        waiting.push_front(id);
        debug!("Participant {} returned to the head of the queue", id);
        Ok(true)
    }

    /// Remove `id` if present. Returns whether it was waiting.
    pub fn remove(&self, id: ParticipantId) -> Result<bool, GameError> {
        let mut waiting = self
            .waiting
            .lock()
            .map_err(|_| GameError::lock_poisoned("queue"))?;

        match waiting.iter().position(|queued| *queued == id) {
            Some(index) => {
                waiting.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.waiting
            .lock()
            .map(|waiting| waiting.contains(&id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.waiting.lock().map(|waiting| waiting.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a worker panicked while holding the queue lock
    pub fn is_poisoned(&self) -> bool {
        self.waiting.is_poisoned()
    }

    /// Snapshot of the waiting order
    pub fn snapshot(&self) -> Vec<ParticipantId> {
        self.waiting
            .lock()
            .map(|waiting| waiting.iter().copied().collect())
            .unwrap_or_default()
    }
}
