//! Pure tic-tac-toe board logic.
//!
//! - [`Board`]: the 3x3 grid, move application and evaluation
//! - [`rules`]: win lines, win and draw detection
//! - [`CpuStrategy`]: heuristic opponent with injectable randomness
//! - [`Position`]: named cells for keyboard navigation
//!
//! Nothing here knows about turns, modes or networking; that is the
//! controller's job.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cpu;
mod position;
pub mod rules;
mod types;

pub use cpu::{CpuStrategy, Dice, MoveReason};
pub use position::{Position, Step};
pub use rules::{Evaluation, WIN_LINES, WinLine};
pub use types::{Board, BoardError, CELL_COUNT, Cell, Symbol};
