//! Display notation for cells and transcript lines
//!
//! Columns are lettered from `A`; ranks count down from 15 at the top edge, so
//! row 0 is rank 15 and row 14 is rank 1.

use super::engine::WinResult;
use super::{Position, Stone, BOARD_SIZE};

/// Label for a cell, e.g. `(7, 5)` → `F8`. Coordinates off the board have
/// no label and are shown as `(row, col)`.
pub fn cell_label(row: u8, col: u8) -> String {
    let size = BOARD_SIZE as u8;
    match (size.checked_sub(row), b'A'.checked_add(col)) {
        (Some(rank), Some(file)) if row < size && col < size => {
            format!("{}{}", file as char, rank)
        }
        _ => format!("({}, {})", row, col),
    }
}

/// Transcript line for a placed stone
pub fn describe_move(stone: Stone, pos: Position) -> String {
    format!("{}: placed at {}", stone, pos.label())
}

/// Transcript line announcing a win and its line
pub fn describe_win(win: &WinResult) -> String {
    let cells: Vec<String> = win.line.iter().map(|p| p.label()).collect();
    format!("{} wins! Line: {}", win.winner, cells.join(", "))
}
