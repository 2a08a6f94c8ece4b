//! Board model and win detection
//!
//! A [`BoardEngine`] is the single source of truth for one participant's view
//! of a match. It performs no I/O and has no locking of its own.

pub mod engine;
pub mod notation;

use crate::error::GameError;
use serde::{Deserialize, Serialize};

pub use engine::{Axis, BoardEngine, WinResult};
pub use notation::{cell_label, describe_move, describe_win};

/// Board edge length
pub const BOARD_SIZE: usize = 15;

/// Minimum run length that wins
pub const WIN_LENGTH: usize = 5;

/// State of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stone {
    #[default]
    Empty,
    Black,
    White,
}

impl Stone {
    /// The other player's colour (`Empty` stays `Empty`)
    pub fn opponent(self) -> Self {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
            Stone::Empty => Stone::Empty,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Stone::Empty
    }
}

impl std::fmt::Display for Stone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stone::Empty => write!(f, "Empty"),
            Stone::Black => write!(f, "Black"),
            Stone::White => write!(f, "White"),
        }
    }
}

/// A cell coordinate, always inside the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// Build a position, rejecting coordinates outside the board
    pub fn try_new(row: i32, col: i32) -> Result<Self, GameError> {
        if Self::is_valid(row, col) {
            Ok(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            Err(GameError::InvalidPlacement {
                row,
                col,
                reason: format!("coordinates must be within 0..{}", BOARD_SIZE),
            })
        }
    }

    #[inline]
    pub fn is_valid(row: i32, col: i32) -> bool {
        (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
    }

    /// Step by `(dr, dc)`; `None` when the step leaves the board
    #[inline]
    pub fn offset(self, dr: i32, dc: i32) -> Option<Self> {
        let row = self.row as i32 + dr;
        let col = self.col as i32 + dc;
        Self::is_valid(row, col).then(|| Self {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Display label such as `F8`
    pub fn label(self) -> String {
        cell_label(self.row, self.col)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
