//! Peer message protocol.
//!
//! One JSON object per message, tagged by `type`:
//! `{"type":"ready"}`, `{"type":"init"}`, `{"type":"move","index":4}`,
//! `{"type":"restart"}`.

use serde::{Deserialize, Serialize};

/// A message exchanged between the two peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PeerMessage {
    /// Joiner to host: my channel is open, start the game.
    Ready,
    /// Host to joiner: acknowledged, both sides start.
    Init,
    /// Sender played the given cell.
    Move {
        /// Cell index, expected 0-8.
        index: usize,
    },
    /// Sender reset the board; the receiver mirrors it without echoing.
    Restart,
}

impl PeerMessage {
    /// Encodes the message as a single JSON line (no trailing newline).
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes a message from one JSON line.
    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}
