//! Win detection.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{Board, Cell, Symbol};

/// One of the eight index triples that win the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinLine(pub [usize; 3]);

impl WinLine {
    /// The three cell indices of this line.
    pub fn cells(&self) -> [usize; 3] {
        self.0
    }

    /// Returns true if `index` is part of this line.
    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }
}

/// Winning lines in declaration order: rows, then columns, then diagonals.
pub const WIN_LINES: [WinLine; 8] = [
    // Rows
    WinLine([0, 1, 2]),
    WinLine([3, 4, 5]),
    WinLine([6, 7, 8]),
    // Columns
    WinLine([0, 3, 6]),
    WinLine([1, 4, 7]),
    WinLine([2, 5, 8]),
    // Diagonals
    WinLine([0, 4, 8]),
    WinLine([2, 4, 6]),
];

/// Returns the first line (in declaration order) held entirely by one symbol.
#[instrument(skip(board))]
pub fn winning_line(board: &Board) -> Option<(Symbol, WinLine)> {
    let cells = board.cells();
    WIN_LINES.iter().find_map(|line| {
        let [a, b, c] = line.cells();
        match cells[a] {
            Cell::Occupied(symbol) if cells[b] == cells[a] && cells[c] == cells[a] => {
                Some((symbol, *line))
            }
            _ => None,
        }
    })
}
