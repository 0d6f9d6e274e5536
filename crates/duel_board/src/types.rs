//! Core domain types for the 3x3 board.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::rules::{self, Evaluation};

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// One of the two playable marks.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum Symbol {
    /// X always moves first.
    X,
    /// O moves second.
    O,
}

impl Symbol {
    /// Returns the other symbol.
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Cell {
    /// Nobody has played here yet.
    #[default]
    Empty,
    /// Cell holds a symbol.
    Occupied(Symbol),
}

impl Cell {
    /// Returns the symbol in this cell, if any.
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(symbol) => Some(symbol),
        }
    }

    /// Returns true if nobody has played here.
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// Error returned by [`Board::apply_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum BoardError {
    /// The cell already holds a symbol.
    #[display("Cell {} is already occupied", _0)]
    CellOccupied(usize),

    /// The index is outside 0..=8.
    #[display("Cell index {} is out of bounds (must be 0-8)", _0)]
    OutOfBounds(usize),
}

impl std::error::Error for BoardError {}

/// 3x3 board, cells in row-major order (0-8).
///
/// Once a cell is occupied it stays occupied until [`Board::reset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from nine optional symbols, row-major.
    pub fn from_symbols(symbols: [Option<Symbol>; CELL_COUNT]) -> Self {
        Self {
            cells: symbols.map(|s| s.map_or(Cell::Empty, Cell::Occupied)),
        }
    }

    /// Gets the cell at the given index, `None` when out of bounds.
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Checks if the cell at `index` is empty. Out-of-bounds counts as not empty.
    pub fn is_empty(&self, index: usize) -> bool {
        matches!(self.get(index), Some(Cell::Empty))
    }

    /// Returns all cells.
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    /// Indices of all empty cells, ascending.
    pub fn empty_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(index, _)| index)
            .collect()
    }

    /// Places `symbol` at `index`.
    ///
    /// Turn legality is not checked here. A failed call leaves the board untouched.
    ///
    /// # Errors
    ///
    /// [`BoardError::CellOccupied`] if the cell holds a symbol,
    /// [`BoardError::OutOfBounds`] if `index > 8`.
    #[instrument(skip(self))]
    pub fn apply_move(&mut self, index: usize, symbol: Symbol) -> Result<(), BoardError> {
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(BoardError::OutOfBounds(index))?;
        if !cell.is_empty() {
            debug!(index, "Rejected move on occupied cell");
            return Err(BoardError::CellOccupied(index));
        }
        *cell = Cell::Occupied(symbol);
        Ok(())
    }

    /// Evaluates the board: a win, a draw, or still ongoing.
    #[instrument(skip(self))]
    pub fn evaluate(&self) -> Evaluation {
        rules::evaluate(self)
    }

    /// Clears every cell.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.cells = [Cell::Empty; CELL_COUNT];
    }
}
