//! What the controller tells the frontend.

use derive_more::Display;
use duel_board::{Symbol, WinLine};
use serde::{Deserialize, Serialize};

use super::session::Mode;
use crate::error::ErrorKind;
use crate::room::RoomCode;

/// Status line shown under the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Status {
    /// Local modes: whose move it is.
    #[display("It's {}'s turn", _0)]
    Turn(Symbol),
    /// Networked: local input accepted.
    #[display("Your turn")]
    YourTurn,
    /// Networked: waiting for the peer.
    #[display("Opponent's turn...")]
    OpponentTurn,
    /// Local modes: someone won.
    #[display("Player {} has won!", _0)]
    Winner(Symbol),
    /// Networked: this side won.
    #[display("You win!")]
    YouWin,
    /// Networked: the peer won.
    #[display("Opponent wins!")]
    OpponentWins,
    /// Board full, nobody won.
    #[display("Game ended in a draw!")]
    Draw,
}

/// Progress messages while a connection is being set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Host is registering its room.
    #[display("Creating room...")]
    CreatingRoom,
    /// A guest's channel opened on the host.
    #[display("Player connected! Waiting for them to be ready...")]
    GuestConnected,
    /// Host received `ready`.
    #[display("Player is ready! Starting game...")]
    GuestReady,
    /// Joiner is dialing.
    #[display("Connecting...")]
    Connecting,
    /// Joiner's channel opened.
    #[display("Connection established! Readying up...")]
    Established,
}

/// Which screen should be visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    /// Mode selection.
    Menu,
    /// Waiting for a guest, room code on display.
    Hosting,
    /// Room code entry.
    Joining,
    /// The board.
    Game {
        /// Mode being played.
        mode: Mode,
        /// This side's symbol in networked play.
        my_symbol: Option<Symbol>,
    },
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    /// `winner` completed `line`.
    Won {
        /// Winning symbol.
        winner: Symbol,
        /// Line to highlight.
        line: WinLine,
    },
    /// Board full, nobody won.
    Draw,
}

/// Receives every change the frontend should render.
pub trait GameView {
    /// A cell now holds `symbol`.
    fn on_cell_updated(&mut self, index: usize, symbol: Symbol);
    /// Every cell is empty again and no line is highlighted.
    fn on_board_cleared(&mut self);
    /// New status line.
    fn on_status_changed(&mut self, status: Status);
    /// New score.
    fn on_score_changed(&mut self, wins_x: u32, wins_o: u32);
    /// The game is over.
    fn on_game_ended(&mut self, outcome: GameOutcome);
    /// The room is open under `code`.
    fn on_room_ready(&mut self, code: &RoomCode);
    /// Connection setup progress.
    fn on_connection_status(&mut self, status: ConnectionStatus);
    /// The peer left mid-session.
    fn on_disconnected(&mut self);
    /// Something went wrong; `message` is ready to show.
    fn on_error(&mut self, kind: ErrorKind, message: &str);
    /// Switch screens.
    fn on_view_changed(&mut self, view: View);
}

/// One [`GameView`] call, as data.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    /// See [`GameView::on_cell_updated`].
    CellUpdated {
        /// Cell index.
        index: usize,
        /// Symbol placed.
        symbol: Symbol,
    },
    /// See [`GameView::on_board_cleared`].
    BoardCleared,
    /// See [`GameView::on_status_changed`].
    StatusChanged(Status),
    /// See [`GameView::on_score_changed`].
    ScoreChanged {
        /// Wins for X.
        wins_x: u32,
        /// Wins for O.
        wins_o: u32,
    },
    /// See [`GameView::on_game_ended`].
    GameEnded(GameOutcome),
    /// See [`GameView::on_room_ready`].
    RoomReady(RoomCode),
    /// See [`GameView::on_connection_status`].
    ConnectionStatus(ConnectionStatus),
    /// See [`GameView::on_disconnected`].
    Disconnected,
    /// See [`GameView::on_error`].
    Error {
        /// Classification.
        kind: ErrorKind,
        /// Text to show.
        message: String,
    },
    /// See [`GameView::on_view_changed`].
    ViewChanged(View),
}

impl ViewUpdate {
    /// Delivers the update to `view`.
    pub fn apply_to<V: GameView + ?Sized>(self, view: &mut V) {
        match self {
            ViewUpdate::CellUpdated { index, symbol } => view.on_cell_updated(index, symbol),
            ViewUpdate::BoardCleared => view.on_board_cleared(),
            ViewUpdate::StatusChanged(status) => view.on_status_changed(status),
            ViewUpdate::ScoreChanged { wins_x, wins_o } => view.on_score_changed(wins_x, wins_o),
            ViewUpdate::GameEnded(outcome) => view.on_game_ended(outcome),
            ViewUpdate::RoomReady(code) => view.on_room_ready(&code),
            ViewUpdate::ConnectionStatus(status) => view.on_connection_status(status),
            ViewUpdate::Disconnected => view.on_disconnected(),
            ViewUpdate::Error { kind, message } => view.on_error(kind, &message),
            ViewUpdate::ViewChanged(target) => view.on_view_changed(target),
        }
    }
}
