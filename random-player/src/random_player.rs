use std::time::Duration;

use game_core::{Action, ActionGenerator, ActionGeneratorData, Game, GameError, Player, PlayerError, State};
use rand::{seq::SliceRandom, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde_json::Value;

use crate::RandomOptions;

/// A computer player that picks uniformly among the legal actions its own
/// action generator currently enumerates (§4.4, grounded in
/// `original_source/Players/RandomMove/Player.cpp`).
///
/// It never "thinks" in the background: `start_thinking`/`stop_thinking`
/// are no-ops that still satisfy the `Player` state machine.
pub struct RandomPlayer {
    name: String,
    generator: ActionGenerator,
    data: ActionGeneratorData,
    rng: Xoshiro256PlusPlus,
}

impl RandomPlayer {
    /// Creates a new [`RandomPlayer`] bound to `state`. `data` carries the
    /// optional `actionGenerator: {type, data}` (defaulting to the game's
    /// `"default"` generator, the same convention `MCTSPlayer` follows) and
    /// optional `seed` fields of the `add_player` request.
    pub fn new(game: &Game, state: &State, data: &Value) -> Result<Self, GameError> {
        let empty = Value::Object(serde_json::Map::new());
        let action_generator_data = data.get("actionGenerator").unwrap_or(&empty);
        let generator_type = action_generator_data.get("type").and_then(Value::as_str).unwrap_or("default");
        let generator_config = action_generator_data.get("data").unwrap_or(&empty);

        let generator = ActionGenerator::create(game, generator_type, generator_config)?;
        let cursor = generator.init_data(state);
        let options = RandomOptions::from_json(data);

        Ok(Self {
            name: "Random Player".to_string(),
            generator,
            data: cursor,
            rng: Xoshiro256PlusPlus::seed_from_u64(options.seed),
        })
    }
}

impl Player for RandomPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_thinking(&mut self) {}

    fn stop_thinking(&mut self) {}

    fn get_best_action(&mut self, _deadline: Option<Duration>) -> Result<Action, PlayerError> {
        let actions = self.data.collect_canonical(&self.generator);
        actions.choose(&mut self.rng).copied().ok_or(PlayerError::IllegalState)
    }

    fn update(&mut self, action: Action) {
        self.generator.update(&mut self.data, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::State;
    use serde_json::json;

    fn tic_tac_toe() -> (Game, State) {
        let game = Game::create("tic_tac_toe", &json!({})).unwrap();
        let state = State::create(&game, None).unwrap();
        (game, state)
    }

    #[test]
    fn defaults_to_the_default_generator_when_action_generator_is_absent() {
        let (game, state) = tic_tac_toe();
        let mut player = RandomPlayer::new(&game, &state, &json!({})).unwrap();
        let action = player.get_best_action(None).unwrap();
        assert!(matches!(action, Action::TicTacToe(_)));
    }

    #[test]
    fn honors_an_explicit_nested_actionGenerator_and_seed() {
        let (game, state) = tic_tac_toe();
        let data = json!({ "actionGenerator": { "type": "default", "data": {} }, "seed": 5 });
        let mut player = RandomPlayer::new(&game, &state, &data).unwrap();
        assert!(player.get_best_action(None).is_ok());
    }

    #[test]
    fn picked_action_is_always_among_the_legal_moves() {
        let (game, state) = tic_tac_toe();
        let mut player = RandomPlayer::new(&game, &state, &json!({ "seed": 2 })).unwrap();
        for _ in 0..20 {
            let action = player.get_best_action(None).unwrap();
            assert!(game.is_valid_action(&state, &action));
        }
    }

    #[test]
    fn update_advances_the_generator_cursor() {
        let (game, state) = tic_tac_toe();
        let mut player = RandomPlayer::new(&game, &state, &json!({})).unwrap();
        let initial = player.data.collect_canonical(&player.generator).len();
        player.update(Action::TicTacToe(game_core::games::tic_tac_toe::Action { row: 0, col: 0 }));
        assert_eq!(player.data.collect_canonical(&player.generator).len(), initial - 1);
    }
}
