//! Game rules for the 3x3 grid.
//!
//! Pure functions over a [`Board`]. Rules are separated from board
//! storage so the controller and the CPU heuristic share one definition.

pub mod draw;
pub mod win;

pub use draw::is_full;
pub use win::{WIN_LINES, WinLine, winning_line};

use serde::{Deserialize, Serialize};

use crate::{Board, Symbol};

/// Result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Evaluation {
    /// No winner and at least one empty cell.
    Ongoing,
    /// `symbol` owns every cell of `line`.
    Won {
        /// The winning symbol.
        symbol: Symbol,
        /// First completed line in declaration order.
        line: WinLine,
    },
    /// Board is full and no line is complete.
    Draw,
}

impl Evaluation {
    /// Returns true once the game can no longer continue.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Evaluation::Ongoing)
    }

    /// Returns the winner, if any.
    pub fn winner(&self) -> Option<Symbol> {
        match self {
            Evaluation::Won { symbol, .. } => Some(*symbol),
            _ => None,
        }
    }
}

/// Evaluates the board: first winning line, then draw, else ongoing.
pub fn evaluate(board: &Board) -> Evaluation {
    if let Some((symbol, line)) = winning_line(board) {
        return Evaluation::Won { symbol, line };
    }
    if is_full(board) {
        Evaluation::Draw
    } else {
        Evaluation::Ongoing
    }
}
