use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, trace};

use game_core::{Action, ActionGenerator, Game, Player, State};
use mcts_player::MCTSPlayer;
use random_player::RandomPlayer;

use crate::error::ServerError;
use crate::handles::{ActionGeneratorRecord, GameRecord, PlayerRecord, StateRecord};
use crate::protocol::{Request, Response};
use crate::registry::Registry;

/// Top-level dispatch surface (C6/C7). Holds only the `games` registry;
/// everything else nests under it per §4.1.
pub struct Server {
    games: Registry<GameRecord>,
}

impl Server {
    pub fn new() -> Self {
        Self { games: Registry::new() }
    }

    /// Parses and serves one request line, producing the response to
    /// write back. Never panics on malformed input — a parse failure is
    /// reported as `success: false` like any other handler error.
    pub fn handle_line(&self, line: &str) -> Response {
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => return Response::err(None, format!("schema violation: {err}")),
        };

        let id = request.id.clone();
        match self.dispatch(&request.kind, &request.data) {
            Ok(data) => Response::ok(id, data),
            Err(err) => Response::err(id, err.to_string()),
        }
    }

    fn dispatch(&self, kind: &str, data: &Value) -> Result<Value, ServerError> {
        let span = tracing::debug_span!("dispatch", kind);
        let _entered = span.enter();
        debug!("dispatching request");
        match kind {
            "echo" => self.echo(data),
            "add_game" => self.add_game(data),
            "add_state" => self.add_state(data),
            "add_player" => self.add_player(data),
            "add_action_generator" => self.add_action_generator(data),
            "remove_game" => self.remove_game(data),
            "remove_state" => self.remove_state(data),
            "remove_player" => self.remove_player(data),
            "remove_action_generator" => self.remove_action_generator(data),
            "generate_actions" => self.generate_actions(data),
            "take_action" => self.take_action(data),
            "start_thinking" => self.start_thinking(data),
            "stop_thinking" => self.stop_thinking(data),
            "get_best_action" => self.get_best_action(data),
            "query_details" => self.query_details(data),
            other => Err(ServerError::UnknownType(other.to_string())),
        }
    }

    fn with_game<R>(&self, data: &Value, f: impl FnOnce(&GameRecord) -> Result<R, ServerError>) -> Result<R, ServerError> {
        let game_id = field_u32(data, "gameID")?;
        trace!(game_id, "awaiting games registry");
        self.games.access(game_id, "game", f)
    }

    fn with_state<R>(&self, data: &Value, f: impl FnOnce(&GameRecord, &StateRecord) -> Result<R, ServerError>) -> Result<R, ServerError> {
        let state_id = field_u32(data, "stateID")?;
        self.with_game(data, |game_record| {
            trace!(state_id, "awaiting states registry");
            game_record.states.access(state_id, "state", |state_record| f(game_record, state_record))
        })
    }

    fn with_player<R>(
        &self,
        data: &Value,
        f: impl FnOnce(&GameRecord, &StateRecord, &PlayerRecord) -> Result<R, ServerError>,
    ) -> Result<R, ServerError> {
        let player_id = field_u32(data, "playerID")?;
        self.with_state(data, |game_record, state_record| {
            trace!(player_id, "awaiting players registry");
            state_record
                .players
                .access(player_id, "player", |player_record| f(game_record, state_record, player_record))
        })
    }

    fn with_action_generator<R>(
        &self,
        data: &Value,
        f: impl FnOnce(&GameRecord, &StateRecord, &ActionGeneratorRecord) -> Result<R, ServerError>,
    ) -> Result<R, ServerError> {
        let generator_id = field_u32(data, "actionGeneratorID")?;
        self.with_state(data, |game_record, state_record| {
            trace!(generator_id, "awaiting action generators registry");
            state_record
                .action_generators
                .access(generator_id, "action generator", |gen_record| f(game_record, state_record, gen_record))
        })
    }

    fn echo(&self, data: &Value) -> Result<Value, ServerError> {
        let sleep_time = data.get("sleepTime").and_then(Value::as_f64).unwrap_or(0.0).max(0.0);
        std::thread::sleep(Duration::from_secs_f64(sleep_time));
        Ok(match data.get("data") {
            Some(echoed) => json!({ "data": echoed }),
            None => json!({}),
        })
    }

    fn add_game(&self, data: &Value) -> Result<Value, ServerError> {
        let kind = string_field(data, "type")?;
        let game_data = data.get("data").cloned().unwrap_or(Value::Null);
        let game = Game::create(kind, &game_data)?;
        let id = self.games.emplace(GameRecord { game, states: Registry::new() });
        Ok(json!({ "gameID": id }))
    }

    fn add_state(&self, data: &Value) -> Result<Value, ServerError> {
        self.with_game(data, |game_record| {
            let state = State::create(&game_record.game, data.get("data"))?;
            let id = game_record.states.emplace(StateRecord {
                state: RwLock::new(state),
                players: Registry::new(),
                action_generators: Registry::new(),
            });
            Ok(json!({ "stateID": id }))
        })
    }

    fn add_player(&self, data: &Value) -> Result<Value, ServerError> {
        self.with_state(data, |game_record, state_record| {
            let kind = string_field(data, "type")?;
            let player_data = data.get("data").cloned().unwrap_or(Value::Null);
            let state = state_record.state.read();
            let player = create_player(kind, &game_record.game, &state, &player_data)?;
            drop(state);
            let id = state_record.players.emplace(PlayerRecord {
                player: parking_lot::Mutex::new(player),
            });
            Ok(json!({ "playerID": id }))
        })
    }

    fn add_action_generator(&self, data: &Value) -> Result<Value, ServerError> {
        self.with_state(data, |game_record, state_record| {
            let kind = data.get("type").and_then(Value::as_str).unwrap_or("default");
            let generator_data = data.get("data").cloned().unwrap_or(Value::Null);
            let generator = ActionGenerator::create(&game_record.game, kind, &generator_data)?;
            let state = state_record.state.read();
            let cursor = generator.init_data(&state);
            drop(state);
            let id = state_record
                .action_generators
                .emplace(ActionGeneratorRecord { generator, data: RwLock::new(cursor) });
            Ok(json!({ "actionGeneratorID": id }))
        })
    }

    fn remove_game(&self, data: &Value) -> Result<Value, ServerError> {
        let game_id = field_u32(data, "gameID")?;
        self.games
            .erase(game_id)
            .ok_or_else(|| ServerError::UnknownHandle(format!("unknown game id {game_id}")))?;
        Ok(json!({}))
    }

    fn remove_state(&self, data: &Value) -> Result<Value, ServerError> {
        let state_id = field_u32(data, "stateID")?;
        self.with_game(data, |game_record| {
            game_record
                .states
                .erase(state_id)
                .ok_or_else(|| ServerError::UnknownHandle(format!("unknown state id {state_id}")))?;
            Ok(json!({}))
        })
    }

    fn remove_player(&self, data: &Value) -> Result<Value, ServerError> {
        let player_id = field_u32(data, "playerID")?;
        self.with_state(data, |_game_record, state_record| {
            let record = state_record
                .players
                .erase(player_id)
                .ok_or_else(|| ServerError::UnknownHandle(format!("unknown player id {player_id}")))?;
            // Join any background search workers before the record is
            // dropped (§9 Open Question ii).
            record.player.lock().stop_thinking();
            Ok(json!({}))
        })
    }

    fn remove_action_generator(&self, data: &Value) -> Result<Value, ServerError> {
        let generator_id = field_u32(data, "actionGeneratorID")?;
        self.with_state(data, |_game_record, state_record| {
            state_record
                .action_generators
                .erase(generator_id)
                .ok_or_else(|| ServerError::UnknownHandle(format!("unknown action generator id {generator_id}")))?;
            Ok(json!({}))
        })
    }

    fn generate_actions(&self, data: &Value) -> Result<Value, ServerError> {
        self.with_action_generator(data, |_game_record, state_record, generator_record| {
            // `GenerateActions`: shared state_lock, shared gen_lock (§4.2).
            let _state_guard = state_record.state.read();
            let cursor = generator_record.data.read();
            let mut actions = Vec::new();
            generator_record.generator.for_each(&cursor, |action| actions.push(action.to_json()));
            Ok(json!({ "actions": actions }))
        })
    }

    fn take_action(&self, data: &Value) -> Result<Value, ServerError> {
        self.with_state(data, |game_record, state_record| {
            let action_data = data
                .get("action")
                .ok_or_else(|| ServerError::SchemaViolation("take_action requires an \"action\" field".to_string()))?;
            let action = Action::create(&game_record.game, action_data)?;

            // `TakeAction`: exclusive state_lock for the whole operation,
            // so the invariant "invalid action leaves state and dependents
            // unchanged" (Invariant 4) holds without a separate check phase.
            let mut state = state_record.state.write();
            if !game_record.game.is_valid_action(&state, &action) {
                return Err(ServerError::IllegalAction("the action is invalid for the current state".to_string()));
            }

            let result = game_record.game.take_action(&mut state, &action);
            let state_json = state.to_json();
            debug!(finished = result.is_some(), "applied action, notifying dependents");

            // Two parallel fan-outs notify dependents; the state_lock
            // above is still held for their whole duration and only
            // released once this closure returns (§4.2).
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    state_record.players.for_each_parallel(|player_record| {
                        player_record.player.lock().update(action);
                    });
                });
                scope.spawn(|| {
                    state_record.action_generators.for_each_parallel(|generator_record| {
                        let mut cursor = generator_record.data.write();
                        generator_record.generator.update(&mut cursor, action);
                    });
                });
            });

            let mut response = json!({ "finished": result.is_some(), "state": state_json });
            if let Some(result) = result {
                response["result"] = json!(result);
            }
            Ok(response)
        })
    }

    fn start_thinking(&self, data: &Value) -> Result<Value, ServerError> {
        self.with_player(data, |_game_record, state_record, player_record| {
            let _state_guard = state_record.state.read();
            player_record.player.lock().start_thinking();
            Ok(json!({}))
        })
    }

    fn stop_thinking(&self, data: &Value) -> Result<Value, ServerError> {
        self.with_player(data, |_game_record, state_record, player_record| {
            let _state_guard = state_record.state.read();
            player_record.player.lock().stop_thinking();
            Ok(json!({}))
        })
    }

    fn get_best_action(&self, data: &Value) -> Result<Value, ServerError> {
        self.with_player(data, |_game_record, state_record, player_record| {
            let deadline = data.get("maxThinkTime").and_then(Value::as_f64).map(Duration::from_secs_f64);
            let _state_guard = state_record.state.read();
            let action = player_record.player.lock().get_best_action(deadline)?;
            Ok(json!({ "action": action.to_json() }))
        })
    }

    /// `QueryDetails` is a stub in the original implementation this system
    /// was distilled from; its semantics were never specified there either,
    /// so it is registered and always succeeds with an empty object rather
    /// than inventing behavior for it.
    fn query_details(&self, _data: &Value) -> Result<Value, ServerError> {
        Ok(json!({}))
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

fn create_player(kind: &str, game: &Game, state: &State, data: &Value) -> Result<Box<dyn Player>, ServerError> {
    match kind {
        "random" => Ok(Box::new(RandomPlayer::new(game, state, data)?)),
        "mcts" => Ok(Box::new(MCTSPlayer::new("mcts", game, state, data)?)),
        other => Err(ServerError::UnknownType(other.to_string())),
    }
}

fn field_u32(data: &Value, name: &str) -> Result<u32, ServerError> {
    data.get(name)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .ok_or_else(|| ServerError::SchemaViolation(format!("missing or non-numeric \"{name}\"")))
}

fn string_field<'a>(data: &'a Value, name: &str) -> Result<&'a str, ServerError> {
    data.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ServerError::SchemaViolation(format!("missing or non-string \"{name}\"")))
}
