//! Per-symbol win counters.

use derive_getters::Getters;
use duel_board::Symbol;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Wins per symbol for the current visit to the game screen.
///
/// Survives restarts; cleared only when returning to the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Getters, Serialize, Deserialize)]
pub struct ScoreTracker {
    /// Games won by X.
    wins_x: u32,
    /// Games won by O.
    wins_o: u32,
}

impl ScoreTracker {
    /// Creates a 0-0 score.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a win for `symbol`.
    #[instrument(skip(self))]
    pub fn record_win(&mut self, symbol: Symbol) {
        match symbol {
            Symbol::X => self.wins_x = self.wins_x.saturating_add(1),
            Symbol::O => self.wins_o = self.wins_o.saturating_add(1),
        }
        debug!(wins_x = self.wins_x, wins_o = self.wins_o, "Score updated");
    }

    /// Wins for one symbol.
    pub fn wins(&self, symbol: Symbol) -> u32 {
        match symbol {
            Symbol::X => self.wins_x,
            Symbol::O => self.wins_o,
        }
    }

    /// Resets both counters to zero.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
