//! Tic-tac-toe: 3x3 board, 3-in-a-row wins, full board with no winner draws.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GameError;

pub const SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub row: u8,
    pub col: u8,
}

impl Action {
    pub fn from_json(data: &Value) -> Result<Self, GameError> {
        let row = data
            .get("row")
            .and_then(Value::as_u64)
            .ok_or_else(|| GameError::SchemaViolation("action.row missing".into()))?;
        let col = data
            .get("col")
            .and_then(Value::as_u64)
            .ok_or_else(|| GameError::SchemaViolation("action.col missing".into()))?;
        Ok(Self {
            row: row as u8,
            col: col as u8,
        })
    }

    pub fn to_json(self) -> Value {
        json!({ "row": self.row, "col": self.col })
    }

    fn cell_index(self) -> usize {
        self.row as usize * SIZE + self.col as usize
    }

    fn from_cell_index(idx: usize) -> Self {
        Self {
            row: (idx / SIZE) as u8,
            col: (idx % SIZE) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    /// 0 = empty, 1 = player 0's mark, 2 = player 1's mark.
    pub board: [[u8; SIZE]; SIZE],
    pub move_count: u8,
}

impl State {
    pub fn new() -> Self {
        Self {
            board: [[0; SIZE]; SIZE],
            move_count: 0,
        }
    }

    pub fn from_json(data: &Value) -> Result<Self, GameError> {
        let rows = data
            .get("board")
            .and_then(Value::as_array)
            .ok_or_else(|| GameError::SchemaViolation("state.board missing".into()))?;
        if rows.len() != SIZE {
            return Err(GameError::SchemaViolation("state.board must have 3 rows".into()));
        }
        let mut board = [[0u8; SIZE]; SIZE];
        let mut move_count = 0u8;
        for (r, row) in rows.iter().enumerate() {
            let cells = row
                .as_array()
                .ok_or_else(|| GameError::SchemaViolation("state.board row must be an array".into()))?;
            if cells.len() != SIZE {
                return Err(GameError::SchemaViolation("state.board row must have 3 cells".into()));
            }
            for (c, cell) in cells.iter().enumerate() {
                let value = cell
                    .as_u64()
                    .ok_or_else(|| GameError::SchemaViolation("state.board cell must be 0, 1 or 2".into()))?;
                if value > 2 {
                    return Err(GameError::SchemaViolation("state.board cell must be 0, 1 or 2".into()));
                }
                board[r][c] = value as u8;
                if value != 0 {
                    move_count += 1;
                }
            }
        }
        Ok(Self { board, move_count })
    }

    pub fn to_json(&self) -> Value {
        json!({ "board": self.board })
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Game;

impl Game {
    pub fn new(_data: &Value) -> Result<Self, GameError> {
        Ok(Self)
    }

    pub fn is_valid_action(&self, state: &State, action: &Action) -> bool {
        (action.row as usize) < SIZE && (action.col as usize) < SIZE && state.board[action.row as usize][action.col as usize] == 0
    }

    pub fn next_player(&self, state: &State) -> u8 {
        state.move_count & 1
    }

    pub fn take_action(&self, state: &mut State, action: &Action) -> Option<Vec<f64>> {
        let player = self.next_player(state);
        state.board[action.row as usize][action.col as usize] = player + 1;
        state.move_count += 1;

        if Self::has_won(&state.board, player + 1) {
            let mut result = vec![0.0; 2];
            result[player as usize] = 1.0;
            return Some(result);
        }
        if state.move_count as usize == SIZE * SIZE {
            return Some(vec![0.5, 0.5]);
        }
        None
    }

    fn has_won(board: &[[u8; SIZE]; SIZE], mark: u8) -> bool {
        for i in 0..SIZE {
            if (0..SIZE).all(|j| board[i][j] == mark) || (0..SIZE).all(|j| board[j][i] == mark) {
                return true;
            }
        }
        (0..SIZE).all(|i| board[i][i] == mark) || (0..SIZE).all(|i| board[i][SIZE - 1 - i] == mark)
    }
}

/// Per-cursor occupancy snapshot; mutated only through [`crate::ActionGenerator::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionGeneratorData {
    occupied: [bool; SIZE * SIZE],
}

impl ActionGeneratorData {
    pub fn from_state(state: &State) -> Self {
        let mut occupied = [false; SIZE * SIZE];
        for r in 0..SIZE {
            for c in 0..SIZE {
                if state.board[r][c] != 0 {
                    occupied[r * SIZE + c] = true;
                }
            }
        }
        Self { occupied }
    }

    pub fn first(&self) -> Option<Action> {
        self.next_from(0)
    }

    pub fn next(&self, after: Action) -> Option<Action> {
        self.next_from(after.cell_index() + 1)
    }

    fn next_from(&self, from_idx: usize) -> Option<Action> {
        (from_idx..SIZE * SIZE)
            .find(|&idx| !self.occupied[idx])
            .map(Action::from_cell_index)
    }

    pub fn for_each(&self, mut f: impl FnMut(Action)) {
        let mut cursor = self.first();
        while let Some(action) = cursor {
            f(action);
            cursor = self.next(action);
        }
    }

    pub fn update(&mut self, action: Action) {
        self.occupied[action.cell_index()] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_win_is_detected() {
        let mut state = State::from_json(&json!({"board": [[1,1,0],[2,2,0],[0,0,0]]})).unwrap();
        let game = Game;
        let action = Action { row: 0, col: 2 };
        assert!(game.is_valid_action(&state, &action));
        let result = game.take_action(&mut state, &action);
        assert_eq!(result, Some(vec![1.0, 0.0]));
    }

    #[test]
    fn draw_is_detected() {
        let mut state = State::from_json(&json!({"board": [[1,2,1],[1,2,2],[2,1,0]]})).unwrap();
        let game = Game;
        let result = game.take_action(&mut state, &Action { row: 2, col: 2 });
        assert_eq!(result, Some(vec![0.5, 0.5]));
    }

    #[test]
    fn invalid_action_rejected() {
        let state = State::from_json(&json!({"board": [[1,0,0],[0,0,0],[0,0,0]]})).unwrap();
        assert!(!Game.is_valid_action(&state, &Action { row: 0, col: 0 }));
    }

    #[test]
    fn generator_fidelity_after_update() {
        let state = State::new();
        let mut data = ActionGeneratorData::from_state(&state);
        assert_eq!(data.first(), Some(Action { row: 0, col: 0 }));
        data.update(Action { row: 0, col: 0 });
        let mut actions = vec![];
        data.for_each(|a| actions.push(a));
        assert_eq!(actions.len(), 8);
        assert!(!actions.contains(&Action { row: 0, col: 0 }));
    }
}
