use pretty_assertions::{assert_eq, assert_ne};
use serde_json::{json, Value};
use session_server::Server;

fn call(server: &Server, kind: &str, data: Value) -> Value {
    let line = json!({ "type": kind, "data": data }).to_string();
    let response = server.handle_line(&line);
    assert!(response.success, "{kind} failed: {:?}", response.err_msg);
    response.data.unwrap_or(json!({}))
}

fn call_err(server: &Server, kind: &str, data: Value) -> String {
    let line = json!({ "type": kind, "data": data }).to_string();
    let response = server.handle_line(&line);
    assert!(!response.success, "{kind} unexpectedly succeeded");
    response.err_msg.unwrap_or_default()
}

/// S1: two MCTS players alternate `get_best_action`/`take_action` on an
/// empty board; the game must finish within 9 moves with a result vector
/// summing to 1.
#[test]
fn s1_tic_tac_toe_full_game_between_two_mcts_players() {
    let server = Server::new();
    let game_id = call(&server, "add_game", json!({ "type": "tic_tac_toe", "data": {} }))["gameID"].clone();
    let state_id = call(&server, "add_state", json!({ "gameID": game_id }))["stateID"].clone();

    let player_ids: Vec<Value> = (0..2)
        .map(|_| {
            call(
                &server,
                "add_player",
                json!({ "gameID": game_id, "stateID": state_id, "type": "mcts", "data": { "thinkTimeMs": 100, "threadCount": 1 } }),
            )["playerID"]
                .clone()
        })
        .collect();

    let mut finished = false;
    let mut result = None;
    for move_number in 0..9 {
        let player_id = &player_ids[move_number % 2];
        let best = call(
            &server,
            "get_best_action",
            json!({ "gameID": game_id, "stateID": state_id, "playerID": player_id }),
        );
        let action = best["action"].clone();

        let outcome = call(&server, "take_action", json!({ "gameID": game_id, "stateID": state_id, "action": action }));
        if outcome["finished"].as_bool().unwrap() {
            finished = true;
            result = outcome.get("result").cloned();
            break;
        }
    }

    assert!(finished, "game did not terminate within 9 moves");
    let result = result.expect("finished game must report a result");
    let sum: f64 = result.as_array().unwrap().iter().map(|v| v.as_f64().unwrap()).sum();
    assert!((sum - 1.0).abs() < 1e-9, "result vector {result} must sum to 1");
}

/// S2: a forced-win position where only one move avoids the loss.
#[test]
fn s2_forced_win_is_found() {
    let server = Server::new();
    let game_id = call(&server, "add_game", json!({ "type": "tic_tac_toe", "data": {} }))["gameID"].clone();
    let board = json!([[1, 1, 0], [2, 2, 0], [0, 0, 0]]);
    let state_id = call(&server, "add_state", json!({ "gameID": game_id, "data": { "board": board } }))["stateID"].clone();

    let player_id = call(
        &server,
        "add_player",
        json!({ "gameID": game_id, "stateID": state_id, "type": "mcts", "data": { "thinkTimeMs": 500, "threadCount": 1, "seed": 1 } }),
    )["playerID"]
        .clone();

    let best = call(
        &server,
        "get_best_action",
        json!({ "gameID": game_id, "stateID": state_id, "playerID": player_id }),
    );
    assert_eq!(best["action"], json!({ "row": 0, "col": 2 }));
}

/// S3: an illegal action fails with an error mentioning "invalid" and
/// leaves the state untouched.
#[test]
fn s3_illegal_action_is_rejected_and_state_is_unchanged() {
    let server = Server::new();
    let game_id = call(&server, "add_game", json!({ "type": "tic_tac_toe", "data": {} }))["gameID"].clone();
    let board = json!([[1, 0, 0], [0, 0, 0], [0, 0, 0]]);
    let state_id = call(&server, "add_state", json!({ "gameID": game_id, "data": { "board": board } }))["stateID"].clone();

    let before = call(&server, "generate_actions", json!({ "gameID": game_id, "stateID": state_id }));

    let err = call_err(
        &server,
        "take_action",
        json!({ "gameID": game_id, "stateID": state_id, "action": { "row": 0, "col": 0 } }),
    );
    assert!(err.to_lowercase().contains("invalid"), "errMsg {err} should mention \"invalid\"");

    let after = call(&server, "generate_actions", json!({ "gameID": game_id, "stateID": state_id }));
    assert_eq!(before, after, "state must be unchanged after a rejected action");
}

/// S6: removing a state, then addressing it again, fails with an
/// "unknown"-flavored error rather than panicking.
#[test]
fn s6_unknown_handle_after_removal() {
    let server = Server::new();
    let game_id = call(&server, "add_game", json!({ "type": "tic_tac_toe", "data": {} }))["gameID"].clone();
    let state_id = call(&server, "add_state", json!({ "gameID": game_id }))["stateID"].clone();

    call(&server, "remove_state", json!({ "gameID": game_id, "stateID": state_id }));

    let err = call_err(
        &server,
        "add_player",
        json!({ "gameID": game_id, "stateID": state_id, "type": "random", "data": {} }),
    );
    assert!(err.to_lowercase().contains("unknown"), "errMsg {err} should mention an unknown state");
}

/// Handle integrity (property 1): ids are never reused, and any access
/// after removal fails.
#[test]
fn handle_ids_are_never_reused_after_removal() {
    let server = Server::new();
    let game_a = call(&server, "add_game", json!({ "type": "tic_tac_toe", "data": {} }))["gameID"].clone();
    call(&server, "remove_game", json!({ "gameID": game_a }));
    let game_b = call(&server, "add_game", json!({ "type": "tic_tac_toe", "data": {} }))["gameID"].clone();
    assert_ne!(game_a, game_b);

    let err = call_err(&server, "add_state", json!({ "gameID": game_a }));
    assert!(err.to_lowercase().contains("unknown"));
}

/// Recursive removal (property 2): removing a game invalidates every
/// state/player/generator handle nested under it.
#[test]
fn removing_a_game_invalidates_everything_nested_under_it() {
    let server = Server::new();
    let game_id = call(&server, "add_game", json!({ "type": "tic_tac_toe", "data": {} }))["gameID"].clone();
    let state_id = call(&server, "add_state", json!({ "gameID": game_id }))["stateID"].clone();
    let player_id = call(
        &server,
        "add_player",
        json!({ "gameID": game_id, "stateID": state_id, "type": "random", "data": {} }),
    )["playerID"]
        .clone();

    call(&server, "remove_game", json!({ "gameID": game_id }));

    let err = call_err(
        &server,
        "start_thinking",
        json!({ "gameID": game_id, "stateID": state_id, "playerID": player_id }),
    );
    assert!(err.to_lowercase().contains("unknown"));
}

/// Malformed request lines never panic the server; they just fail.
#[test]
fn malformed_json_is_reported_as_a_schema_violation_not_a_panic() {
    let server = Server::new();
    let response = server.handle_line("not json at all");
    assert!(!response.success);
    assert!(response.err_msg.unwrap().to_lowercase().contains("schema"));
}
