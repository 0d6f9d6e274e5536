//! Room codes and peer identifiers.

use derive_getters::Getters;
use derive_more::{Display, Error};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Length of a room code.
pub const ROOM_CODE_LEN: usize = 6;

/// Exactly six ASCII digits, `100000`..=`999999` when generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub struct RoomCode(String);

/// Input that is not a six-digit room code.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Invalid room code {:?}: expected exactly 6 digits", input)]
pub struct RoomCodeError {
    /// The rejected input.
    pub input: String,
}

impl RoomCode {
    /// Validates user input. Surrounding whitespace is ignored; anything else
    /// must match `^\d{6}$`.
    #[instrument]
    pub fn parse(input: &str) -> Result<Self, RoomCodeError> {
        let code = input.trim();
        if code.len() == ROOM_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(RoomCodeError {
                input: input.to_string(),
            })
        }
    }

    /// Generates a fresh code in `100000..=999999`.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self(rng.random_range(100_000u32..=999_999).to_string())
    }

    /// The code as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The code as a number.
    pub fn value(&self) -> u32 {
        // Six ASCII digits always fit.
        self.0.bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
    }
}

impl std::str::FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Addressable endpoint: a fixed prefix followed by the room code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Builds the identifier for a room.
    pub fn for_room(prefix: &str, code: &RoomCode) -> Self {
        Self(format!("{}{}", prefix, code))
    }

    /// The identifier as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Room code plus the identifier derived from it, fresh for every hosting attempt.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct NetworkIdentity {
    room_code: RoomCode,
    peer_id: PeerId,
}

impl NetworkIdentity {
    /// Derives the identity for an existing code.
    pub fn new(prefix: &str, room_code: RoomCode) -> Self {
        let peer_id = PeerId::for_room(prefix, &room_code);
        Self { room_code, peer_id }
    }

    /// Generates a fresh code and derives its identity.
    pub fn generate<R: Rng>(prefix: &str, rng: &mut R) -> Self {
        Self::new(prefix, RoomCode::generate(rng))
    }
}
