//! Tic-tac-toe with local, CPU and peer-to-peer play.
//!
//! # Architecture
//!
//! - **duel_board**: board, win/draw rules and the CPU heuristic (separate crate)
//! - **Controller**: pure state machine owning the game and score
//! - **Network**: peer sessions over a pluggable transport (TCP or in-process)
//! - **Runtime**: async loop feeding events to the controller and applying its effects
//! - **Terminal UI**: ratatui frontend
//!
//! # Example
//!
//! ```
//! use tictactoe_duel::{ControllerEvent, GameSessionController, Mode, UiRequest};
//! use tictactoe_duel::config::CpuConfig;
//! use rand::SeedableRng;
//!
//! let mut controller =
//!     GameSessionController::from_config(&CpuConfig::default(), rand::rngs::StdRng::seed_from_u64(0));
//! let effects = controller.handle(ControllerEvent::Ui(UiRequest::Start(Mode::LocalTwoPlayer)));
//! assert!(!effects.is_empty());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
mod controller;
mod error;
pub mod logging;
pub mod network;
mod protocol;
mod room;
mod runtime;
mod score;
pub mod tui;

// Crate-level exports - Configuration
pub use config::{ConfigError, DuelConfig};

// Crate-level exports - Controller
pub use controller::{
    CPU_SYMBOL, ConnectionStatus, ControllerEvent, Effect, GameOutcome, GameSessionController,
    GameView, Mode, Session, Status, TurnControl, UiRequest, View, ViewUpdate,
};

// Crate-level exports - Errors
pub use error::ErrorKind;

// Crate-level exports - Protocol and rooms
pub use protocol::PeerMessage;
pub use room::{NetworkIdentity, PeerId, ROOM_CODE_LEN, RoomCode, RoomCodeError};

// Crate-level exports - Runtime
pub use runtime::{Frontend, Runtime, transport_from_config};

// Crate-level exports - Score
pub use score::ScoreTracker;

// Crate-level exports - Board types
pub use duel_board::{Board, BoardError, Position, Symbol, WinLine};
