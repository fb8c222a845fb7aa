//! Gobang (five-in-a-row / gomoku): configurable square board and run length.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GameError;

pub const DEFAULT_BOARD_SIZE: u8 = 15;
pub const DEFAULT_RUN_LENGTH: u8 = 5;

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

    fn cell_index(self, board_size: u8) -> usize {
        self.row as usize * board_size as usize + self.col as usize
    }

    fn from_cell_index(idx: usize, board_size: u8) -> Self {
        Self {
            row: (idx / board_size as usize) as u8,
            col: (idx % board_size as usize) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    /// Row-major, 0 = empty, 1 = player 0's stone, 2 = player 1's stone.
    pub board: Vec<Vec<u8>>,
    pub move_count: u32,
}

impl State {
    pub fn new(board_size: u8) -> Self {
        Self {
            board: vec![vec![0u8; board_size as usize]; board_size as usize],
            move_count: 0,
        }
    }

    pub fn from_json(data: &Value, board_size: u8) -> Result<Self, GameError> {
        let rows = data
            .get("board")
            .and_then(Value::as_array)
            .ok_or_else(|| GameError::SchemaViolation("state.board missing".into()))?;
        if rows.len() != board_size as usize {
            return Err(GameError::SchemaViolation("state.board has the wrong number of rows".into()));
        }
        let mut board = vec![vec![0u8; board_size as usize]; board_size as usize];
        let mut move_count = 0u32;
        for (r, row) in rows.iter().enumerate() {
            let cells = row
                .as_array()
                .ok_or_else(|| GameError::SchemaViolation("state.board row must be an array".into()))?;
            if cells.len() != board_size as usize {
                return Err(GameError::SchemaViolation("state.board row has the wrong number of cells".into()));
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

    fn board_size(&self) -> u8 {
        self.board.len() as u8
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Game {
    pub board_size: u8,
    pub run_length: u8,
}

impl Game {
    pub fn new(data: &Value) -> Result<Self, GameError> {
        let board_size = match data.get("boardSize") {
            Some(v) => v
                .as_u64()
                .ok_or_else(|| GameError::SchemaViolation("boardSize must be a positive integer".into()))? as u8,
            None => DEFAULT_BOARD_SIZE,
        };
        let run_length = match data.get("runLength") {
            Some(v) => v
                .as_u64()
                .ok_or_else(|| GameError::SchemaViolation("runLength must be a positive integer".into()))? as u8,
            None => DEFAULT_RUN_LENGTH,
        };
        if board_size == 0 || run_length == 0 || run_length > board_size {
            return Err(GameError::SchemaViolation("runLength must be in 1..=boardSize".into()));
        }
        Ok(Self { board_size, run_length })
    }

    pub fn is_valid_action(&self, state: &State, action: &Action) -> bool {
        (action.row as usize) < state.board.len()
            && (action.col as usize) < state.board.len()
            && state.board[action.row as usize][action.col as usize] == 0
    }

    pub fn next_player(&self, state: &State) -> u8 {
        (state.move_count & 1) as u8
    }

    pub fn take_action(&self, state: &mut State, action: &Action) -> Option<Vec<f64>> {
        let player = self.next_player(state);
        state.board[action.row as usize][action.col as usize] = player + 1;
        state.move_count += 1;

        if self.has_won(state, action, player + 1) {
            let mut result = vec![0.0; 2];
            result[player as usize] = 1.0;
            return Some(result);
        }
        if state.move_count as usize == (state.board_size() as usize) * (state.board_size() as usize) {
            return Some(vec![0.5, 0.5]);
        }
        None
    }

    /// Only the four lines through the stone just placed can have changed, so
    /// win detection is local to `action` rather than a full-board scan.
    fn has_won(&self, state: &State, action: &Action, mark: u8) -> bool {
        const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];
        let size = state.board_size() as i32;
        let (row, col) = (action.row as i32, action.col as i32);

        for (dr, dc) in DIRECTIONS {
            let mut count = 1;
            for sign in [1, -1] {
                let mut r = row + dr * sign;
                let mut c = col + dc * sign;
                while r >= 0 && r < size && c >= 0 && c < size && state.board[r as usize][c as usize] == mark {
                    count += 1;
                    r += dr * sign;
                    c += dc * sign;
                }
            }
            if count >= self.run_length {
                return true;
            }
        }
        false
    }
}

/// Per-cursor occupancy snapshot; mutated only through [`crate::ActionGenerator::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionGeneratorData {
    occupied: Vec<bool>,
    board_size: u8,
}

impl ActionGeneratorData {
    pub fn from_state(state: &State) -> Self {
        let board_size = state.board_size();
        let mut occupied = vec![false; board_size as usize * board_size as usize];
        for r in 0..board_size as usize {
            for c in 0..board_size as usize {
                if state.board[r][c] != 0 {
                    occupied[r * board_size as usize + c] = true;
                }
            }
        }
        Self { occupied, board_size }
    }

    pub fn first(&self) -> Option<Action> {
        self.next_from(0)
    }

    pub fn next(&self, after: Action) -> Option<Action> {
        self.next_from(after.cell_index(self.board_size) + 1)
    }

    fn next_from(&self, from_idx: usize) -> Option<Action> {
        (from_idx..self.occupied.len())
            .find(|&idx| !self.occupied[idx])
            .map(|idx| Action::from_cell_index(idx, self.board_size))
    }

    pub fn for_each(&self, mut f: impl FnMut(Action)) {
        let mut cursor = self.first();
        while let Some(action) = cursor {
            f(action);
            cursor = self.next(action);
        }
    }

    pub fn update(&mut self, action: Action) {
        let idx = action.cell_index(self.board_size);
        self.occupied[idx] = true;
    }
}
