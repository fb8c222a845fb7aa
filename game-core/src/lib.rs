//! Game rule interface (C1), action generator contract (C2) and player
//! interface (C3) shared by every game the session server can host.
//!
//! Games are a closed, tagged union rather than a trait-object hierarchy:
//! adding a game means adding an enum variant and a module under `games/`,
//! not a new `dyn` boundary. See `games::tic_tac_toe` and `games::gobang`.

mod action_generator;
mod error;
mod game;
pub mod games;
mod player;

pub use action_generator::{ActionGenerator, ActionGeneratorData};
pub use error::{GameError, PlayerError};
pub use game::{Action, Game, State};
pub use player::Player;
