//! Network error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// Classification of a network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum NetworkErrorKind {
    /// The target peer identifier does not exist.
    RoomNotFound,
    /// The host identifier is already taken.
    RoomCodeInUse,
    /// Any other transport failure.
    Other,
}

/// Network error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{}: {} at {}:{}", kind, message, file, line)]
pub struct NetworkError {
    /// Classification.
    pub kind: NetworkErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl NetworkError {
    /// Creates a new network error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// The target room does not exist.
    #[track_caller]
    pub fn room_not_found(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::RoomNotFound, message)
    }

    /// The room identifier is already taken.
    #[track_caller]
    pub fn room_code_in_use(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::RoomCodeInUse, message)
    }

    /// Any other failure.
    #[track_caller]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Other, message)
    }
}

impl From<std::io::Error> for NetworkError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::other(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for NetworkError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::other(format!("Malformed frame: {}", err))
    }
}
