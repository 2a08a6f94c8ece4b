//! Wire messages exchanged with game clients
//!
//! Each WebSocket text frame carries one JSON object tagged by `type`.

use crate::error::GameError;
use serde::{Deserialize, Serialize};

/// Default path of the game endpoint
pub const GAME_PATH: &str = "/game";

/// Messages sent by a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinQueue,
    MovePlaced { row: i32, col: i32 },
    EndMatch,
}

/// Messages sent to a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    MatchStarted { goes_first: bool },
    OpponentMoved { row: i32, col: i32 },
    /// The peer disconnected; the match is over
    MatchEndedByPeer,
    /// The last request was refused; sent to the requester only
    Rejected { reason: String },
}

impl ServerMessage {
    /// Name used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::MatchStarted { .. } => "match_started",
            ServerMessage::OpponentMoved { .. } => "opponent_moved",
            ServerMessage::MatchEndedByPeer => "match_ended_by_peer",
            ServerMessage::Rejected { .. } => "rejected",
        }
    }
}

/// Message serialization and validation utilities
pub struct MessageUtils;

impl MessageUtils {
    /// Parse one inbound text frame
    pub fn parse_client_message(text: &str) -> Result<ClientMessage, GameError> {
        serde_json::from_str(text).map_err(|e| GameError::InvalidMessage {
            reason: format!("Failed to deserialize client message: {}", e),
        })
    }

    pub fn encode_client_message(message: &ClientMessage) -> Result<String, GameError> {
        serde_json::to_string(message).map_err(|e| GameError::InternalError {
            message: format!("Failed to serialize client message: {}", e),
        })
    }

    pub fn parse_server_message(text: &str) -> Result<ServerMessage, GameError> {
        serde_json::from_str(text).map_err(|e| GameError::InvalidMessage {
            reason: format!("Failed to deserialize server message: {}", e),
        })
    }

    pub fn encode_server_message(message: &ServerMessage) -> Result<String, GameError> {
        serde_json::to_string(message).map_err(|e| GameError::InternalError {
            message: format!("Failed to serialize server message: {}", e),
        })
    }
}
