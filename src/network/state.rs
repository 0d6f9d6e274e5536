//! Connection lifecycle and roles.

use duel_board::Symbol;
use serde::{Deserialize, Serialize};

/// Lifecycle of one peer connection, owned by the network session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display)]
pub enum ConnectionState {
    /// Nothing started.
    #[default]
    Idle,
    /// Registering the room or dialing the host.
    Connecting,
    /// Host is listening under its peer identifier.
    PeerOpen,
    /// Channel open on this side; handshake pending.
    DataChannelOpen,
    /// `ready`/`init` exchanged; moves may flow.
    Ready,
    /// Channel closed.
    Closed,
    /// Connection failed.
    Errored,
}

/// Role in networked play, fixed for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Role {
    /// Created the room; plays X and moves first.
    Host,
    /// Entered the room code; plays O.
    Joiner,
}

impl Role {
    /// The symbol this role plays.
    pub fn symbol(self) -> Symbol {
        match self {
            Role::Host => Symbol::X,
            Role::Joiner => Symbol::O,
        }
    }
}
