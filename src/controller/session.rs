//! The live state of one game.

use derive_getters::Getters;
use duel_board::{Board, Symbol, WinLine};
use serde::{Deserialize, Serialize};

use super::view::Status;

/// How a game is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Mode {
    /// Two players sharing one device.
    #[strum(to_string = "2 Players")]
    LocalTwoPlayer,
    /// One player against the CPU.
    #[strum(to_string = "vs CPU")]
    LocalVsCpu,
    /// Two processes over a peer connection.
    #[strum(to_string = "Online")]
    Networked,
}

/// Who may move next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnControl {
    /// Turns follow `current_player`; the CPU, if any, owns one symbol.
    Alternating {
        /// Symbol played by the CPU.
        cpu: Option<Symbol>,
    },
    /// Local input is accepted only while `is_my_turn` holds.
    ///
    /// `my_symbol` is fixed for the connection; `is_my_turn` starts true
    /// exactly when `my_symbol` is X, is cleared by a local move and set
    /// by a remote one.
    Networked {
        /// Symbol this side plays.
        my_symbol: Symbol,
        /// Whether local input is accepted.
        is_my_turn: bool,
    },
}

/// Board, turn and activity of the current game.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Session {
    /// The grid.
    board: Board,
    /// Symbol to move; advisory only in networked play.
    current_player: Symbol,
    /// False once the game is won or drawn.
    active: bool,
    /// Line completed by the winner.
    winning_line: Option<WinLine>,
    /// Turn ownership rules for the mode.
    control: TurnControl,
}

impl Session {
    /// Fresh, active game with X to move.
    pub fn new(control: TurnControl) -> Self {
        let mut session = Self {
            board: Board::new(),
            current_player: Symbol::X,
            active: true,
            winning_line: None,
            control,
        };
        session.reset();
        session
    }

    /// The mode this session was started in.
    pub fn mode(&self) -> Mode {
        match self.control {
            TurnControl::Alternating { cpu: None } => Mode::LocalTwoPlayer,
            TurnControl::Alternating { cpu: Some(_) } => Mode::LocalVsCpu,
            TurnControl::Networked { .. } => Mode::Networked,
        }
    }

    /// Symbol this side plays in networked mode.
    pub fn my_symbol(&self) -> Option<Symbol> {
        match self.control {
            TurnControl::Networked { my_symbol, .. } => Some(my_symbol),
            TurnControl::Alternating { .. } => None,
        }
    }

    /// Symbol the CPU plays, if any.
    pub fn cpu_symbol(&self) -> Option<Symbol> {
        match self.control {
            TurnControl::Alternating { cpu } => cpu,
            TurnControl::Networked { .. } => None,
        }
    }

    /// Networked turn ownership; `None` in local modes.
    pub fn is_my_turn(&self) -> Option<bool> {
        match self.control {
            TurnControl::Networked { is_my_turn, .. } => Some(is_my_turn),
            TurnControl::Alternating { .. } => None,
        }
    }

    /// Whether it is the CPU's move.
    pub fn is_cpu_turn(&self) -> bool {
        self.active && self.cpu_symbol() == Some(self.current_player)
    }

    /// Whether input from this device would currently be accepted.
    pub fn accepts_local_input(&self) -> bool {
        self.active
            && match self.control {
                TurnControl::Networked { is_my_turn, .. } => is_my_turn,
                TurnControl::Alternating { cpu } => cpu != Some(self.current_player),
            }
    }

    /// The symbol a local move places.
    pub fn local_symbol(&self) -> Symbol {
        self.my_symbol().unwrap_or(self.current_player)
    }

    /// Clears the board and gives X the move. Networked turn ownership is
    /// recomputed so the host always starts.
    pub fn reset(&mut self) {
        self.board.reset();
        self.current_player = Symbol::X;
        self.active = true;
        self.winning_line = None;
        if let TurnControl::Networked {
            my_symbol,
            is_my_turn,
        } = &mut self.control
        {
            *is_my_turn = *my_symbol == Symbol::X;
        }
    }

    pub(super) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub(super) fn set_my_turn(&mut self, value: bool) {
        if let TurnControl::Networked { is_my_turn, .. } = &mut self.control {
            *is_my_turn = value;
        }
    }

    pub(super) fn advance_turn(&mut self) {
        self.current_player = self.current_player.opponent();
    }

    pub(super) fn finish(&mut self, winning_line: Option<WinLine>) {
        self.active = false;
        self.winning_line = winning_line;
        self.set_my_turn(false);
    }

    /// Status line for the current state.
    pub fn status(&self) -> Status {
        if !self.active {
            let winner = self
                .winning_line
                .and_then(|line| self.board.get(line.cells()[0]))
                .and_then(|cell| cell.symbol());
            return match (winner, self.my_symbol()) {
                (None, _) => Status::Draw,
                (Some(winner), Some(mine)) if winner == mine => Status::YouWin,
                (Some(_), Some(_)) => Status::OpponentWins,
                (Some(winner), None) => Status::Winner(winner),
            };
        }
        match self.is_my_turn() {
            Some(true) => Status::YourTurn,
            Some(false) => Status::OpponentTurn,
            None => Status::Turn(self.current_player),
        }
    }
}
