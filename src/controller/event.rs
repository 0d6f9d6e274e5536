//! Controller inputs and outputs.

use std::time::Duration;

use super::session::Mode;
use super::view::ViewUpdate;
use crate::network::NetworkEvent;
use crate::protocol::PeerMessage;
use crate::room::RoomCode;

/// Something the player asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiRequest {
    /// Start a local game. Networked games start through the handshake only.
    Start(Mode),
    /// Play a cell.
    LocalMove(usize),
    /// Clear the board and play again.
    Restart,
    /// Open a room and wait for a guest.
    Host,
    /// Show the room code entry.
    OpenJoin,
    /// Join the room with this code, as typed.
    Join(String),
    /// Leave to the main menu.
    ReturnToMenu,
}

/// Input to [`super::GameSessionController::handle`].
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Player input.
    Ui(UiRequest),
    /// Something happened on a network session.
    Network(NetworkEvent),
    /// A scheduled CPU move is due.
    CpuTurn {
        /// Ticket handed out with [`Effect::ScheduleCpuMove`].
        ticket: u64,
    },
}

/// Work the controller wants done on its behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Tell the frontend.
    View(ViewUpdate),
    /// Send to the peer over the open session.
    Send(PeerMessage),
    /// Deliver [`ControllerEvent::CpuTurn`] with `ticket` after `delay`.
    ScheduleCpuMove {
        /// Identifies the game state the move was scheduled for.
        ticket: u64,
        /// Pause before the move.
        delay: Duration,
    },
    /// Open a hosting session with a fresh room code.
    OpenHost {
        /// Generation the session's events must carry.
        generation: u64,
    },
    /// Open a joining session for `code`.
    OpenJoin {
        /// Generation the session's events must carry.
        generation: u64,
        /// Room to join.
        code: RoomCode,
    },
    /// Drop the current network session, if any.
    CloseNetwork,
}

impl From<ViewUpdate> for Effect {
    fn from(update: ViewUpdate) -> Self {
        Effect::View(update)
    }
}
