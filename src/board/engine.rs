//! Board state machine with anchored win detection
//!
//! Each placement only needs to look at the four axes through the stone that
//! was just placed: any new winning run must include it.

use super::{Position, Stone, BOARD_SIZE, WIN_LENGTH};
use crate::error::GameError;
use serde::{Deserialize, Serialize};

/// One of the four scan directions through a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
    /// Top-left to bottom-right
    DiagonalDownRight,
    /// Top-right to bottom-left
    DiagonalDownLeft,
}

impl Axis {
    /// Scan order; ties between axes resolve to the earliest entry
    pub const ALL: [Axis; 4] = [
        Axis::Horizontal,
        Axis::Vertical,
        Axis::DiagonalDownRight,
        Axis::DiagonalDownLeft,
    ];

    /// Unit step `(d_row, d_col)` along the axis
    pub fn step(self) -> (i32, i32) {
        match self {
            Axis::Horizontal => (0, 1),
            Axis::Vertical => (1, 0),
            Axis::DiagonalDownRight => (1, 1),
            Axis::DiagonalDownLeft => (1, -1),
        }
    }
}

/// A completed line of five or more
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinResult {
    pub winner: Stone,
    pub axis: Axis,
    /// Maximal contiguous run, ordered along the axis step
    pub line: Vec<Position>,
}

/// A 15×15 Gomoku board
#[derive(Debug, Clone)]
pub struct BoardEngine {
    cells: [[Stone; BOARD_SIZE]; BOARD_SIZE],
    stones_placed: usize,
    outcome: Option<WinResult>,
}

impl Default for BoardEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardEngine {
    pub fn new() -> Self {
        Self {
            cells: [[Stone::Empty; BOARD_SIZE]; BOARD_SIZE],
            stones_placed: 0,
            outcome: None,
        }
    }

    /// Place a stone and report a win if this placement completed one.
    ///
    /// Fails without touching the board when the game is already decided,
    /// the coordinates are off the board, the cell is occupied, or `stone`
    /// is `Empty`.
    pub fn place_stone(
        &mut self,
        row: i32,
        col: i32,
        stone: Stone,
    ) -> Result<Option<WinResult>, GameError> {
        if self.outcome.is_some() {
            return Err(GameError::GameAlreadyOver);
        }

        if stone.is_empty() {
            return Err(GameError::InvalidPlacement {
                row,
                col,
                reason: "cannot place an empty stone".to_string(),
            });
        }

        let pos = Position::try_new(row, col)?;
        if !self.stone_at(pos).is_empty() {
            return Err(GameError::InvalidPlacement {
                row,
                col,
                reason: format!("cell {} is occupied", pos),
            });
        }

        self.cells[pos.row as usize][pos.col as usize] = stone;
        self.stones_placed += 1;

        let result = self.win_through(pos);
        if let Some(win) = &result {
            self.outcome = Some(win.clone());
        }
        Ok(result)
    }

    /// Whether a placement has already produced a win
    pub fn is_decided(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn winner(&self) -> Option<Stone> {
        self.outcome.as_ref().map(|win| win.winner)
    }

    pub fn winning_line(&self) -> Option<&[Position]> {
        self.outcome.as_ref().map(|win| win.line.as_slice())
    }

    #[inline]
    pub fn stone_at(&self, pos: Position) -> Stone {
        self.cells[pos.row as usize][pos.col as usize]
    }

    /// Cell lookup by raw coordinates; `None` when off the board
    pub fn get(&self, row: i32, col: i32) -> Option<Stone> {
        Position::try_new(row, col).ok().map(|pos| self.stone_at(pos))
    }

    pub fn stones_placed(&self) -> usize {
        self.stones_placed
    }

    pub fn is_full(&self) -> bool {
        self.stones_placed == BOARD_SIZE * BOARD_SIZE
    }

    /// Check the four axes through `anchor` in [`Axis::ALL`] order
    fn win_through(&self, anchor: Position) -> Option<WinResult> {
        let winner = self.stone_at(anchor);
        if winner.is_empty() {
            return None;
        }

        Axis::ALL.iter().find_map(|&axis| {
            let line = self.run_through(anchor, axis);
            (line.len() >= WIN_LENGTH).then(|| WinResult { winner, axis, line })
        })
    }

    /// Maximal run of the anchor's colour along `axis`, ordered by the axis step
    fn run_through(&self, anchor: Position, axis: Axis) -> Vec<Position> {
        let colour = self.stone_at(anchor);
        let (dr, dc) = axis.step();

        let mut start = anchor;
        while let Some(prev) = start.offset(-dr, -dc) {
            if self.stone_at(prev) != colour {
                break;
            }
            start = prev;
        }

        let mut line = vec![start];
        let mut cursor = start;
        while let Some(next) = cursor.offset(dr, dc) {
            if self.stone_at(next) != colour {
                break;
            }
            line.push(next);
            cursor = next;
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pos(row: u8, col: u8) -> Position {
        Position { row, col }
    }

    #[test]
    fn test_horizontal_five_wins() {
        let mut board = BoardEngine::new();
        for col in 5..9 {
            assert_eq!(board.place_stone(7, col, Stone::Black).unwrap(), None);
        }
        let win = board.place_stone(7, 9, Stone::Black).unwrap().unwrap();

        assert_eq!(win.winner, Stone::Black);
        assert_eq!(win.axis, Axis::Horizontal);
        assert_eq!(win.line, (5..=9).map(|c| pos(7, c)).collect::<Vec<_>>());
        assert!(board.is_decided());
        assert_eq!(board.winner(), Some(Stone::Black));
    }

    #[test]
    fn test_win_completed_in_the_middle() {
        let mut board = BoardEngine::new();
        for row in [2, 3, 5, 6] {
            board.place_stone(row, 4, Stone::White).unwrap();
        }
        let win = board.place_stone(4, 4, Stone::White).unwrap().unwrap();

        assert_eq!(win.axis, Axis::Vertical);
        assert_eq!(win.line.first(), Some(&pos(2, 4)));
        assert_eq!(win.line.last(), Some(&pos(6, 4)));
    }

    #[test]
    fn test_diagonals() {
        let mut board = BoardEngine::new();
        for i in 0..4 {
            board.place_stone(i, i, Stone::Black).unwrap();
        }
        let win = board.place_stone(4, 4, Stone::Black).unwrap().unwrap();
        assert_eq!(win.axis, Axis::DiagonalDownRight);
        assert_eq!(win.line[0], pos(0, 0));

        let mut board = BoardEngine::new();
        for i in 0..4 {
            board.place_stone(10 + i, 14 - i, Stone::White).unwrap();
        }
        let win = board.place_stone(14, 10, Stone::White).unwrap().unwrap();
        assert_eq!(win.axis, Axis::DiagonalDownLeft);
        assert_eq!(win.line[0], pos(10, 14));
        assert_eq!(win.line[4], pos(14, 10));
    }

    #[test]
    fn test_four_in_a_row_does_not_win() {
        let mut board = BoardEngine::new();
        for col in 0..4 {
            assert_eq!(board.place_stone(0, col, Stone::Black).unwrap(), None);
        }
        // Broken by an opponent stone
        board.place_stone(0, 4, Stone::White).unwrap();
        assert_eq!(board.place_stone(0, 5, Stone::Black).unwrap(), None);
        assert!(!board.is_decided());
    }

    #[test]
    fn test_run_of_six_reports_all_cells() {
        let mut board = BoardEngine::new();
        for col in [0, 1, 2, 4, 5] {
            board.place_stone(3, col, Stone::Black).unwrap();
        }
        let win = board.place_stone(3, 3, Stone::Black).unwrap().unwrap();
        assert_eq!(win.line.len(), 6);
        assert_eq!(win.line, (0..=5).map(|c| pos(3, c)).collect::<Vec<_>>());
    }

    #[test]
    fn test_simultaneous_axes_report_horizontal() {
        let mut board = BoardEngine::new();
        for i in [0, 1, 3, 4] {
            board.place_stone(7, 5 + i, Stone::Black).unwrap();
            board.place_stone(5 + i, 7, Stone::Black).unwrap();
        }
        let win = board.place_stone(7, 7, Stone::Black).unwrap().unwrap();
        assert_eq!(win.axis, Axis::Horizontal);
        assert!(win.line.iter().all(|p| p.row == 7));
    }

    #[test]
    fn test_occupied_cell_is_rejected() {
        let mut board = BoardEngine::new();
        board.place_stone(7, 7, Stone::Black).unwrap();

        let err = board.place_stone(7, 7, Stone::White).unwrap_err();
        assert!(matches!(err, GameError::InvalidPlacement { row: 7, col: 7, .. }));
        assert_eq!(board.get(7, 7), Some(Stone::Black));
        assert_eq!(board.stones_placed(), 1);
    }

    #[test]
    fn test_out_of_range_and_empty_stone_rejected() {
        let mut board = BoardEngine::new();
        assert!(matches!(
            board.place_stone(15, 0, Stone::Black),
            Err(GameError::InvalidPlacement { .. })
        ));
        assert!(matches!(
            board.place_stone(0, -1, Stone::Black),
            Err(GameError::InvalidPlacement { .. })
        ));
        assert!(matches!(
            board.place_stone(0, 0, Stone::Empty),
            Err(GameError::InvalidPlacement { .. })
        ));
        assert_eq!(board.stones_placed(), 0);
    }

    #[test]
    fn test_placement_after_win_is_rejected() {
        let mut board = BoardEngine::new();
        for col in 0..5 {
            board.place_stone(0, col, Stone::White).unwrap();
        }
        assert_eq!(
            board.place_stone(10, 10, Stone::Black),
            Err(GameError::GameAlreadyOver)
        );
        assert_eq!(board.get(10, 10), Some(Stone::Empty));
    }

    fn axis_strategy() -> impl Strategy<Value = Axis> {
        prop::sample::select(Axis::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_five_in_any_order_wins(
            axis in axis_strategy(),
            start_row in 0i32..15,
            start_col in 0i32..15,
            order in Just((0usize..5).collect::<Vec<_>>()).prop_shuffle(),
            white in any::<bool>(),
        ) {
            let (dr, dc) = axis.step();
            let end_row = start_row + dr * 4;
            let end_col = start_col + dc * 4;
            prop_assume!(Position::is_valid(end_row, end_col));

            let colour = if white { Stone::White } else { Stone::Black };
            let mut board = BoardEngine::new();
            for (n, &i) in order.iter().enumerate() {
                let i = i as i32;
                let result = board
                    .place_stone(start_row + dr * i, start_col + dc * i, colour)
                    .unwrap();
                if n < 4 {
                    prop_assert!(result.is_none());
                } else {
                    let win = result.unwrap();
                    prop_assert_eq!(win.winner, colour);
                    prop_assert!(win.line.len() >= WIN_LENGTH);
                    prop_assert!(win.line.iter().all(|&p| board.stone_at(p) == colour));
                }
            }
        }

        #[test]
        fn prop_cells_never_change_twice(
            moves in prop::collection::vec((0i32..15, 0i32..15), 1..120),
        ) {
            let mut board = BoardEngine::new();
            let mut colour = Stone::Black;
            for (row, col) in moves {
                let before = board.get(row, col).unwrap();
                match board.place_stone(row, col, colour) {
                    Ok(_) => {
                        prop_assert!(before.is_empty());
                        prop_assert_eq!(board.get(row, col), Some(colour));
                        colour = colour.opponent();
                    }
                    Err(_) => prop_assert_eq!(board.get(row, col), Some(before)),
                }
                if board.is_decided() {
                    break;
                }
            }
        }
    }
}
