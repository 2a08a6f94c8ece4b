//! Error types for the relay service
//!
//! Domain operations (board, queue, registry, participant model) return
//! [`GameError`] directly so callers can match on the variant. Service-level
//! plumbing uses anyhow, the same way the rest of the binary does.

use crate::types::ParticipantId;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for game and session scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Invalid placement at ({row}, {col}): {reason}")]
    InvalidPlacement { row: i32, col: i32, reason: String },

    #[error("Game is already over")]
    GameAlreadyOver,

    #[error("Participant already in a match: {participant_id}")]
    AlreadyInMatch { participant_id: ParticipantId },

    #[error("Participant is not in a match")]
    NotInMatch,

    #[error("It is not this participant's turn")]
    NotYourTurn,

    #[error("Invalid message: {reason}")]
    InvalidMessage { reason: String },

    #[error("Invalid discovery beacon: {reason}")]
    InvalidBeacon { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl GameError {
    /// Short, stable label used for metrics and rejection reasons
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::InvalidPlacement { .. } => "invalid_placement",
            GameError::GameAlreadyOver => "game_already_over",
            GameError::AlreadyInMatch { .. } => "already_in_match",
            GameError::NotInMatch => "not_in_match",
            GameError::NotYourTurn => "not_your_turn",
            GameError::InvalidMessage { .. } => "invalid_message",
            GameError::InvalidBeacon { .. } => "invalid_beacon",
            GameError::ConfigurationError { .. } => "configuration",
            GameError::InternalError { .. } => "internal",
        }
    }

    pub(crate) fn lock_poisoned(what: &str) -> Self {
        GameError::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}
