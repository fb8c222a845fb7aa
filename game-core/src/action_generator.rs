use serde_json::Value;

use crate::error::GameError;
use crate::game::{Action, Game, State};
use crate::games::{gobang, tic_tac_toe};

/// Stateless descriptor of how a generator enumerates actions. Bound to a
/// game kind at `create` time; cursors ([`ActionGeneratorData`]) are created
/// independently per registration so many concurrent cursors can exist over
/// the same state (§4.3).
#[derive(Debug, Clone, Copy)]
pub enum ActionGenerator {
    TicTacToeDefault,
    GobangDefault,
}

impl ActionGenerator {
    pub fn create(game: &Game, kind: &str, _data: &Value) -> Result<Self, GameError> {
        match (game, kind) {
            (Game::TicTacToe(_), "default") => Ok(Self::TicTacToeDefault),
            (Game::Gobang(_), "default") => Ok(Self::GobangDefault),
            (_, other) => Err(GameError::UnknownType(other.to_string())),
        }
    }

    /// Seeds a fresh cursor from the current contents of `state`. Once
    /// created, the cursor is only ever advanced through [`Self::update`] —
    /// it never re-reads the live state.
    pub fn init_data(&self, state: &State) -> ActionGeneratorData {
        match (self, state) {
            (Self::TicTacToeDefault, State::TicTacToe(s)) => ActionGeneratorData::TicTacToe(tic_tac_toe::ActionGeneratorData::from_state(s)),
            (Self::GobangDefault, State::Gobang(s)) => ActionGeneratorData::Gobang(gobang::ActionGeneratorData::from_state(s)),
            _ => unreachable!("ActionGenerator is only ever paired with the state of its bound game"),
        }
    }

    pub fn first(&self, data: &ActionGeneratorData) -> Option<Action> {
        match data {
            ActionGeneratorData::TicTacToe(d) => d.first().map(Action::TicTacToe),
            ActionGeneratorData::Gobang(d) => d.first().map(Action::Gobang),
        }
    }

    pub fn next(&self, data: &ActionGeneratorData, after: Action) -> Option<Action> {
        match (data, after) {
            (ActionGeneratorData::TicTacToe(d), Action::TicTacToe(a)) => d.next(a).map(Action::TicTacToe),
            (ActionGeneratorData::Gobang(d), Action::Gobang(a)) => d.next(a).map(Action::Gobang),
            _ => None,
        }
    }

    pub fn for_each(&self, data: &ActionGeneratorData, mut f: impl FnMut(Action)) {
        match data {
            ActionGeneratorData::TicTacToe(d) => d.for_each(|a| f(Action::TicTacToe(a))),
            ActionGeneratorData::Gobang(d) => d.for_each(|a| f(Action::Gobang(a))),
        }
    }

    pub fn update(&self, data: &mut ActionGeneratorData, action: Action) {
        match (data, action) {
            (ActionGeneratorData::TicTacToe(d), Action::TicTacToe(a)) => d.update(a),
            (ActionGeneratorData::Gobang(d), Action::Gobang(a)) => d.update(a),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionGeneratorData {
    TicTacToe(tic_tac_toe::ActionGeneratorData),
    Gobang(gobang::ActionGeneratorData),
}

impl ActionGeneratorData {
    /// Collects the legal-move frontier in canonical (row-major) order, the
    /// order MCTS and `generate_actions` both rely on for deterministic tie
    /// breaking.
    pub fn collect_canonical(&self, generator: &ActionGenerator) -> Vec<Action> {
        let mut actions = Vec::new();
        generator.for_each(self, |a| actions.push(a));
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn two_independent_cursors_over_the_same_state() {
        let game = Game::create("tic_tac_toe", &json!({})).unwrap();
        let state = State::create(&game, None).unwrap();
        let generator = ActionGenerator::create(&game, "default", &json!({})).unwrap();
        let mut cursor_a = generator.init_data(&state);
        let cursor_b = generator.init_data(&state);

        generator.update(&mut cursor_a, Action::TicTacToe(tic_tac_toe::Action { row: 0, col: 0 }));

        assert_eq!(cursor_a.collect_canonical(&generator).len(), 8);
        assert_eq!(cursor_b.collect_canonical(&generator).len(), 9);
    }
}
