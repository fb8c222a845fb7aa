use parking_lot::{Mutex, RwLock};

use game_core::{ActionGenerator, ActionGeneratorData, Game, Player, State};

use crate::registry::Registry;

/// Top-level handle: an immutable rule module plus its **State** children
/// (§3, §4.1).
pub struct GameRecord {
    pub game: Game,
    pub states: Registry<StateRecord>,
}

/// A position within a game. `state` is the `state_lock` of §4.2 — shared
/// for reads (`GenerateActions`), exclusive for `TakeAction`.
pub struct StateRecord {
    pub state: RwLock<State>,
    pub players: Registry<PlayerRecord>,
    pub action_generators: Registry<ActionGeneratorRecord>,
}

/// `player_lock` is always exclusive (§4.2): thinking, best-action
/// selection and updates all mutate the player's internal tree.
pub struct PlayerRecord {
    pub player: Mutex<Box<dyn Player>>,
}

/// `gen_lock` of §4.2: shared for `GenerateActions`, exclusive only for the
/// `update` notification fanned out from `TakeAction`. The generator
/// descriptor itself is stateless and `Copy`; only its cursor needs a lock.
pub struct ActionGeneratorRecord {
    pub generator: ActionGenerator,
    pub data: RwLock<ActionGeneratorData>,
}
