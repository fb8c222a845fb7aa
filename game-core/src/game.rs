use serde_json::Value;

use crate::error::GameError;
use crate::games::{gobang, tic_tac_toe};

/// A game is one variant of a closed set of hosted rule modules. Adding a
/// game means adding a variant here (plus its module under `games/`); the
/// registry, locking protocol and MCTS player never change.
#[derive(Debug, Clone, Copy)]
pub enum Game {
    TicTacToe(tic_tac_toe::Game),
    Gobang(gobang::Game),
}

impl Game {
    pub fn create(kind: &str, data: &Value) -> Result<Self, GameError> {
        match kind {
            "tic_tac_toe" => Ok(Self::TicTacToe(tic_tac_toe::Game::new(data)?)),
            "gobang" => Ok(Self::Gobang(gobang::Game::new(data)?)),
            other => Err(GameError::UnknownType(other.to_string())),
        }
    }

    pub fn is_valid_action(&self, state: &State, action: &Action) -> bool {
        match (self, state, action) {
            (Self::TicTacToe(g), State::TicTacToe(s), Action::TicTacToe(a)) => g.is_valid_action(s, a),
            (Self::Gobang(g), State::Gobang(s), Action::Gobang(a)) => g.is_valid_action(s, a),
            _ => false,
        }
    }

    pub fn next_player(&self, state: &State) -> u8 {
        match (self, state) {
            (Self::TicTacToe(g), State::TicTacToe(s)) => g.next_player(s),
            (Self::Gobang(g), State::Gobang(s)) => g.next_player(s),
            _ => 0,
        }
    }

    /// Mutates `state` in place; returns the result vector once the game has
    /// terminated. Callers must have already checked `is_valid_action`.
    pub fn take_action(&self, state: &mut State, action: &Action) -> Option<Vec<f64>> {
        match (self, state, action) {
            (Self::TicTacToe(g), State::TicTacToe(s), Action::TicTacToe(a)) => g.take_action(s, a),
            (Self::Gobang(g), State::Gobang(s), Action::Gobang(a)) => g.take_action(s, a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    TicTacToe(tic_tac_toe::State),
    Gobang(gobang::State),
}

impl State {
    pub fn create(game: &Game, data: Option<&Value>) -> Result<Self, GameError> {
        match (game, data) {
            (Game::TicTacToe(_), None) => Ok(Self::TicTacToe(tic_tac_toe::State::new())),
            (Game::TicTacToe(_), Some(data)) => Ok(Self::TicTacToe(tic_tac_toe::State::from_json(data)?)),
            (Game::Gobang(g), None) => Ok(Self::Gobang(gobang::State::new(g.board_size))),
            (Game::Gobang(g), Some(data)) => Ok(Self::Gobang(gobang::State::from_json(data, g.board_size)?)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::TicTacToe(s) => s.to_json(),
            Self::Gobang(s) => s.to_json(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    TicTacToe(tic_tac_toe::Action),
    Gobang(gobang::Action),
}

impl Action {
    pub fn create(game: &Game, data: &Value) -> Result<Self, GameError> {
        match game {
            Game::TicTacToe(_) => Ok(Self::TicTacToe(tic_tac_toe::Action::from_json(data)?)),
            Game::Gobang(_) => Ok(Self::Gobang(gobang::Action::from_json(data)?)),
        }
    }

    pub fn to_json(self) -> Value {
        match self {
            Self::TicTacToe(a) => a.to_json(),
            Self::Gobang(a) => a.to_json(),
        }
    }
}
