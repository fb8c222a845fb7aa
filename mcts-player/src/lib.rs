mod arena;
mod mcts_options;
mod mcts_player;
mod node;
mod node_id;
mod tree;
mod worker;

pub use mcts_options::{MCTSOptions, DEFAULT_EXPLORATION_C};
pub use mcts_player::MCTSPlayer;
