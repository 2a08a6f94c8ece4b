//! Common types used throughout the relay service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one network connection
pub type ParticipantId = Uuid;

/// Unique identifier for a match between two participants
pub type MatchId = Uuid;

/// Lifecycle of a single connection as seen by the session server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connected, not queued and not in a match
    Idle,
    /// Waiting in the matchmaking queue
    Queued,
    /// Paired with a peer
    InMatch,
    /// Disconnected (terminal)
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "Idle"),
            ConnectionState::Queued => write!(f, "Queued"),
            ConnectionState::InMatch => write!(f, "InMatch"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
