use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use game_core::{Action, ActionGenerator, ActionGeneratorData, Game, State};
use parking_lot::RwLock;

use crate::node_id::NodeId;

/// Fixed-point scale for `value_sum`: results are floats in `[0, 1]` per
/// player (win = 1.0, draw = 0.5, loss = 0.0); atomics can't hold an `f64`
/// so wins are accumulated as scaled integers instead.
pub const VALUE_SCALE: f64 = 1_000_000.0;

/// Number of simultaneous players. Both hosted games are two-player.
pub const N_PLAYERS: usize = 2;

/// A single node of the search tree (§4.5).
///
/// `visit_count` and `value_sum` are plain atomics read during selection
/// without any lock; `children` is the only per-node lock, and it is held
/// only for the instant it takes to append a freshly expanded child.
pub struct Node {
    pub parent: Option<NodeId>,
    pub action_taken: Option<Action>,
    pub player_to_move: u8,
    /// `Some` once the game has terminated on arriving at this node.
    pub terminal_result: Option<Vec<f64>>,
    /// Legal actions in canonical (action generator) order, computed once.
    pub legal_actions: Vec<Action>,
    /// Cursor into `legal_actions`: `fetch_add` on this atomic *is* the
    /// untried-actions cursor of §4.5, so it needs no separate lock.
    pub next_untried: AtomicUsize,
    /// `(index into legal_actions, child id)`, in the order children were
    /// created (not necessarily canonical order).
    pub children: RwLock<Vec<(u32, NodeId)>>,
    pub visit_count: AtomicI64,
    pub value_sum: [AtomicI64; N_PLAYERS],
    /// The game state at this node. Kept so expansion and rollout never
    /// need to re-derive a position by replaying the path from the root.
    pub state: State,
}

impl Node {
    pub fn new(
        state: State,
        parent: Option<NodeId>,
        action_taken: Option<Action>,
        player_to_move: u8,
        terminal_result: Option<Vec<f64>>,
        generator: &ActionGenerator,
    ) -> Self {
        let legal_actions = if terminal_result.is_some() {
            Vec::new()
        } else {
            let cursor = generator.init_data(&state);
            ActionGeneratorData::collect_canonical(&cursor, generator)
        };

        Self {
            parent,
            action_taken,
            player_to_move,
            terminal_result,
            legal_actions,
            next_untried: AtomicUsize::new(0),
            children: RwLock::new(Vec::new()),
            visit_count: AtomicI64::new(0),
            value_sum: [AtomicI64::new(0), AtomicI64::new(0)],
            state,
        }
    }

    /// A node is terminal when the game ended on arriving at it.
    pub fn is_terminal(&self) -> bool {
        self.terminal_result.is_some()
    }

    /// No untried actions remain: every legal action at this node already
    /// has a child (or is in the process of getting one), so selection
    /// should descend through the existing children instead of expanding
    /// further here.
    pub fn is_fully_expanded(&self) -> bool {
        self.is_terminal() || self.next_untried.load(Ordering::Acquire) >= self.legal_actions.len()
    }

    pub fn visit_count(&self) -> i64 {
        self.visit_count.load(Ordering::Relaxed)
    }

    pub fn value_sum_for(&self, player: u8) -> f64 {
        self.value_sum[player as usize].load(Ordering::Relaxed) as f64 / VALUE_SCALE
    }

    pub fn mean_value_for(&self, player: u8) -> f64 {
        let visits = self.visit_count();
        if visits <= 0 {
            0.0
        } else {
            self.value_sum_for(player) / visits as f64
        }
    }

    pub fn add_virtual_loss(&self, amount: i64) {
        self.visit_count.fetch_add(amount, Ordering::AcqRel);
    }

    /// Undoes the virtual loss applied during descent and records the real
    /// outcome of this iteration: net visit delta is `+1`.
    pub fn backpropagate(&self, result: &[f64], virtual_loss: i64) {
        self.visit_count.fetch_add(1 - virtual_loss, Ordering::AcqRel);
        for (player, value) in result.iter().enumerate().take(N_PLAYERS) {
            self.value_sum[player].fetch_add((value * VALUE_SCALE).round() as i64, Ordering::AcqRel);
        }
    }

    pub fn find_child(&self, action: Action) -> Option<NodeId> {
        let idx = self.legal_actions.iter().position(|a| *a == action)?;
        self.children
            .read()
            .iter()
            .find(|(action_idx, _)| *action_idx as usize == idx)
            .map(|(_, id)| *id)
    }

    /// Rough size of one node in the arena, used to charge the memory
    /// budget before allocating it (§4.5 "Memory budget").
    pub fn estimated_bytes(game: &Game, state: &State, generator: &ActionGenerator) -> usize {
        let cursor = generator.init_data(state);
        let action_count = ActionGeneratorData::collect_canonical(&cursor, generator).len();
        let _ = game;
        std::mem::size_of::<Node>() + action_count * std::mem::size_of::<Action>()
    }
}
