use thiserror::Error;

/// Errors raised by a game rule module, an action generator or a player
/// while resolving a request. These map directly onto the error kinds of
/// §7: `session-server` wraps each variant into the wire-level `errMsg`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("unknown game type '{0}'")]
    UnknownType(String),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("state data does not match the bound game: {0}")]
    SchemaViolation(String),
}

/// Errors a [`crate::Player`] can surface from `get_best_action`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// `GetBestAction` was asked for a move but no legal action exists at
    /// the bound state. The server never hands off a terminal state to a
    /// player, so this only fires if an internal invariant was violated.
    #[error("no legal actions available at the current state")]
    IllegalState,
}
