use thiserror::Error;

use game_core::{GameError, PlayerError};

/// The seven error kinds of §7, surfaced to clients as the response
/// envelope's `errMsg` (see [`crate::protocol::Response`]).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    #[error("unknown handle: {0}")]
    UnknownHandle(String),
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("illegal action: {0}")]
    IllegalAction(String),
    #[error("illegal state: {0}")]
    IllegalState(String),
    /// Never raised by the MCTS player (it degrades quality under memory
    /// pressure instead of failing); kept for non-MCTS players that cannot
    /// degrade gracefully.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GameError> for ServerError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::UnknownType(kind) => Self::UnknownType(kind),
            GameError::InvalidAction(reason) => Self::IllegalAction(reason),
            GameError::SchemaViolation(reason) => Self::SchemaViolation(reason),
        }
    }
}

impl From<PlayerError> for ServerError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::IllegalState => Self::IllegalState(err.to_string()),
        }
    }
}
