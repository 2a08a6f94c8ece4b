//! Gomoku Relay - networked two-player Gomoku
//!
//! A WebSocket server that pairs waiting players and relays moves between
//! them, plus the board rules and the participant-side model each player runs
//! locally. The server never judges a game; each side detects wins on its own
//! board.

pub mod board;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod service;
pub mod session;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{GameError, Result};
pub use types::*;

// Re-export key components
pub use board::{BoardEngine, Position, Stone, WinResult};
pub use client::ParticipantMatch;
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{Outbox, SessionServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
