use std::sync::Arc;
use std::time::Duration;

use game_core::{Action, ActionGenerator, Game, Player, PlayerError, State};
use serde_json::Value;
use tracing::{debug, info};

use crate::mcts_options::MCTSOptions;
use crate::tree::Tree;
use crate::worker::WorkerPool;

/// Margin subtracted off `think_time`/the caller's deadline so a thread join
/// and the final `best_action` read always complete before the protocol's
/// own deadline fires.
const DEADLINE_SAFETY_MARGIN: Duration = Duration::from_millis(20);

/// A player backed by a shared-tree, memory-budgeted, multi-threaded Monte
/// Carlo Tree Search (§4.5). Workers run continuously between
/// `StartThinking` and `StopThinking`; `GetBestAction` is legal in either
/// state and simply reads the current tree.
pub struct MCTSPlayer {
    name: String,
    game: Game,
    generator: ActionGenerator,
    options: MCTSOptions,
    tree: Arc<Tree>,
    workers: Option<WorkerPool>,
}

impl MCTSPlayer {
    pub fn new(name: impl Into<String>, game: &Game, state: &State, data: &Value) -> Result<Self, game_core::GameError> {
        let options = MCTSOptions::from_json(data)?;
        let empty = Value::Object(serde_json::Map::new());
        let generator_config = data.get("actionGenerator").and_then(|v| v.get("data")).unwrap_or(&empty);
        let generator = ActionGenerator::create(game, &options.action_generator, generator_config)?;
        let tree = Arc::new(Tree::new(game, state.clone(), &generator, options.memory_budget, options.exploration_c));

        Ok(Self {
            name: name.into(),
            game: *game,
            generator,
            options,
            tree,
            workers: None,
        })
    }

    fn is_thinking(&self) -> bool {
        self.workers.is_some()
    }
}

impl Player for MCTSPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_thinking(&mut self) {
        if self.is_thinking() {
            return;
        }
        debug!(player = %self.name, "starting background search");
        self.workers = Some(WorkerPool::spawn(
            Arc::clone(&self.tree),
            self.game,
            self.generator,
            self.options.thread_count.get(),
            self.options.seed,
        ));
    }

    fn stop_thinking(&mut self) {
        if let Some(pool) = self.workers.take() {
            pool.shutdown();
            debug!(player = %self.name, nodes = self.tree.node_count(), "stopped background search");
        }
    }

    fn get_best_action(&mut self, deadline: Option<Duration>) -> Result<Action, PlayerError> {
        let budget = deadline.unwrap_or(self.options.think_time).saturating_sub(DEADLINE_SAFETY_MARGIN);

        if self.is_thinking() {
            std::thread::sleep(budget);
            self.stop_thinking();
        } else {
            let pool = WorkerPool::spawn(
                Arc::clone(&self.tree),
                self.game,
                self.generator,
                self.options.thread_count.get(),
                self.options.seed,
            );
            std::thread::sleep(budget);
            pool.shutdown();
        }

        let action = self.tree.best_action()?;
        info!(player = %self.name, nodes = self.tree.node_count(), bytes = self.tree.bytes_used(), "selected action");
        Ok(action)
    }

    fn update(&mut self, action: Action) {
        let was_thinking = self.workers.is_some();
        if was_thinking {
            self.stop_thinking();
        }
        self.tree.update(&self.game, &self.generator, action);
        if was_thinking {
            self.start_thinking();
        }
    }
}

impl Drop for MCTSPlayer {
    fn drop(&mut self) {
        self.stop_thinking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::State;
    use serde_json::json;

    fn new_player(data: Value) -> MCTSPlayer {
        let game = Game::create("tic_tac_toe", &json!({})).unwrap();
        let state = State::create(&game, None).unwrap();
        MCTSPlayer::new("mcts", &game, &state, &data).unwrap()
    }

    #[test]
    fn idle_get_best_action_returns_promptly_and_stays_idle() {
        let mut player = new_player(json!({ "thinkTimeMs": 50, "threadCount": 2, "seed": 1 }));
        let action = player.get_best_action(None).unwrap();
        assert!(matches!(action, Action::TicTacToe(_)));
    }

    #[test]
    fn start_thinking_is_idempotent() {
        let mut player = new_player(json!({ "threadCount": 1, "seed": 1 }));
        player.start_thinking();
        player.start_thinking();
        player.stop_thinking();
    }

    #[test]
    fn get_best_action_while_thinking_stops_the_search_afterward() {
        let mut player = new_player(json!({ "thinkTimeMs": 20, "threadCount": 2, "seed": 1 }));
        player.start_thinking();
        std::thread::sleep(Duration::from_millis(20));
        let action = player.get_best_action(None).unwrap();
        assert!(matches!(action, Action::TicTacToe(_)));
        assert!(!player.is_thinking());
    }

    #[test]
    fn update_while_thinking_pauses_and_resumes_the_search() {
        let mut player = new_player(json!({ "threadCount": 2, "seed": 1 }));
        player.start_thinking();
        std::thread::sleep(Duration::from_millis(20));
        player.update(Action::TicTacToe(game_core::games::tic_tac_toe::Action { row: 0, col: 0 }));
        std::thread::sleep(Duration::from_millis(20));
        player.stop_thinking();
    }
}
