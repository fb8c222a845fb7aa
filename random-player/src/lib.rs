mod random_options;
mod random_player;

pub use random_options::RandomOptions;
pub use random_player::RandomPlayer;
