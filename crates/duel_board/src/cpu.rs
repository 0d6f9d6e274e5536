//! Heuristic CPU opponent.
//!
//! Not optimal play: the CPU occasionally makes a deliberate mistake,
//! otherwise it wins, blocks, takes the center, then a corner.

use tracing::{debug, instrument};

use crate::rules::WIN_LINES;
use crate::{Board, Cell, Symbol};

/// Corner indices.
const CORNERS: [usize; 4] = [0, 2, 6, 8];

/// Center index.
const CENTER: usize = 4;

/// Source of randomness for the CPU heuristic.
///
/// Every [`rand::Rng`] is a `Dice`; tests supply scripted implementations
/// to force a particular branch.
pub trait Dice {
    /// Returns true with the given probability (clamped to `0.0..=1.0`,
    /// NaN counts as zero).
    fn chance(&mut self, probability: f64) -> bool;

    /// Picks an index in `0..len`. Callers never pass zero.
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: rand::Rng> Dice for R {
    fn chance(&mut self, probability: f64) -> bool {
        self.random_bool(sanitize_probability(probability))
    }

    fn pick(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

/// Clamps into `0.0..=1.0`; NaN becomes 0.0.
fn sanitize_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 1.0)
    }
}

/// Which rule produced the CPU's move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MoveReason {
    /// Random empty cell on purpose.
    Mistake,
    /// Completes a CPU line.
    Win,
    /// Blocks an opponent line.
    Block,
    /// Takes the center.
    Center,
    /// Takes a random empty corner.
    Corner,
    /// Nothing else applied; random empty cell.
    Fallback,
}

/// Heuristic move selection for a fixed CPU symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuStrategy {
    symbol: Symbol,
    mistake_rate: f64,
}

impl CpuStrategy {
    /// Probability of a deliberate mistake.
    pub const DEFAULT_MISTAKE_RATE: f64 = 0.25;

    /// Creates a strategy playing `symbol` with the default mistake rate.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            mistake_rate: Self::DEFAULT_MISTAKE_RATE,
        }
    }

    /// Overrides the mistake probability, clamped to `0.0..=1.0` (NaN is 0.0).
    pub fn with_mistake_rate(mut self, mistake_rate: f64) -> Self {
        self.mistake_rate = sanitize_probability(mistake_rate);
        self
    }

    /// The symbol the CPU plays.
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// The configured mistake probability.
    pub fn mistake_rate(&self) -> f64 {
        self.mistake_rate
    }

    /// Chooses an empty cell to play, `None` only when the board is full.
    #[instrument(skip(self, board, dice), fields(cpu = %self.symbol))]
    pub fn choose_move<D: Dice + ?Sized>(&self, board: &Board, dice: &mut D) -> Option<usize> {
        let (index, reason) = self.choose_move_with_reason(board, dice)?;
        debug!(index, %reason, "CPU chose move");
        Some(index)
    }

    /// Like [`CpuStrategy::choose_move`], also reporting which rule fired.
    pub fn choose_move_with_reason<D: Dice + ?Sized>(
        &self,
        board: &Board,
        dice: &mut D,
    ) -> Option<(usize, MoveReason)> {
        let available = board.empty_cells();
        if available.is_empty() {
            return None;
        }

        if dice.chance(self.mistake_rate) {
            return Some((available[dice.pick(available.len())], MoveReason::Mistake));
        }

        if let Some(index) = completing_cell(board, self.symbol) {
            return Some((index, MoveReason::Win));
        }
        if let Some(index) = completing_cell(board, self.symbol.opponent()) {
            return Some((index, MoveReason::Block));
        }
        if board.is_empty(CENTER) {
            return Some((CENTER, MoveReason::Center));
        }

        let corners: Vec<usize> = CORNERS
            .iter()
            .copied()
            .filter(|&i| board.is_empty(i))
            .collect();
        if !corners.is_empty() {
            return Some((corners[dice.pick(corners.len())], MoveReason::Corner));
        }

        Some((available[dice.pick(available.len())], MoveReason::Fallback))
    }
}

/// First line (declaration order) where `symbol` holds two cells and the third is empty.
fn completing_cell(board: &Board, symbol: Symbol) -> Option<usize> {
    let cells = board.cells();
    WIN_LINES.iter().find_map(|line| {
        let indices = line.cells();
        let owned = indices
            .iter()
            .filter(|&&i| cells[i] == Cell::Occupied(symbol))
            .count();
        let empty = indices.iter().copied().find(|&i| cells[i].is_empty());
        if owned == 2 { empty } else { None }
    })
}
