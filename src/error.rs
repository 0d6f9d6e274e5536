//! User-facing error taxonomy.
//!
//! Invalid moves (occupied cell, inactive session, not your turn) are
//! deliberately absent: they are dropped silently and only logged.

use serde::{Deserialize, Serialize};

use crate::network::NetworkErrorKind;

/// Errors surfaced to the player through [`crate::GameView::on_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ErrorKind {
    /// Join input is not exactly six digits. Recoverable in place.
    InvalidRoomCode,
    /// No host answers for the room code. The join view stays open.
    RoomNotFound,
    /// Another host already owns the room code. Returns to the menu.
    RoomCodeInUse,
    /// Any other transport failure. Returns to the menu.
    PeerTransportError,
    /// The peer closed the channel mid-session. Returns to the menu.
    PeerDisconnected,
}

impl ErrorKind {
    /// Whether the player can correct the input and retry without leaving the view.
    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorKind::InvalidRoomCode | ErrorKind::RoomNotFound)
    }

    /// Text shown to the player. `detail` is only used for transport errors.
    pub fn user_message(self, detail: &str) -> String {
        match self {
            ErrorKind::InvalidRoomCode => "Please enter a valid 6-digit code.".to_string(),
            ErrorKind::RoomNotFound => "Room not found. Check the code.".to_string(),
            ErrorKind::RoomCodeInUse => {
                "This room code is already in use. Please try hosting again.".to_string()
            }
            ErrorKind::PeerTransportError => {
                format!("An error occurred: {}. Returning to menu.", detail)
            }
            ErrorKind::PeerDisconnected => "Opponent has disconnected.".to_string(),
        }
    }
}

impl From<NetworkErrorKind> for ErrorKind {
    fn from(kind: NetworkErrorKind) -> Self {
        match kind {
            NetworkErrorKind::RoomNotFound => ErrorKind::RoomNotFound,
            NetworkErrorKind::RoomCodeInUse => ErrorKind::RoomCodeInUse,
            NetworkErrorKind::Other => ErrorKind::PeerTransportError,
        }
    }
}
