use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use game_core::{Action, ActionGenerator, Game, PlayerError, State};
use parking_lot::RwLock;
use rand::Rng;

use crate::arena::Arena;
use crate::node::{Node, N_PLAYERS};
use crate::node_id::NodeId;

/// Node visit_count is bumped by this much on the way down and corrected
/// back at backprop, so two workers seldom select the exact same leaf
/// (§4.5 "Virtual loss").
const VIRTUAL_LOSS: i64 = 3;

struct Inner {
    arena: Arc<Arena>,
    root: NodeId,
}

/// The shared search tree. `inner` holds the current arena and root; the
/// lock around it is only ever held long enough to clone the `Arc<Arena>`
/// and copy the root out (see [`Tree::iterate`]) or to swap in a fresh one
/// (see [`Tree::update`]) — never for the duration of a whole iteration.
/// Nothing in `Tree` or [`crate::worker::Worker`] stops a worker mid-iteration;
/// it is up to the caller to fully stop and join every worker before calling
/// `update`, so the swap never races a worker still reading the old arena.
pub struct Tree {
    inner: RwLock<Inner>,
    exploration_c: f64,
}

/// One instance of `legal_actions[idx]` and its value for tie-breaking.
struct Candidate {
    action_idx: u32,
    node: NodeId,
    score: f64,
}

impl Tree {
    pub fn new(game: &Game, state: State, generator: &ActionGenerator, memory_budget: usize, exploration_c: f64) -> Self {
        let arena = Arc::new(Arena::new(memory_budget));
        let player_to_move = game.next_player(&state);
        let root = arena.push(Node::new(state, None, None, player_to_move, None, generator));
        Self {
            inner: RwLock::new(Inner { arena, root }),
            exploration_c,
        }
    }

    pub fn bytes_used(&self) -> usize {
        self.inner.read().arena.bytes_used()
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().arena.len()
    }

    /// Runs exactly one MCTS iteration: select, maybe expand, rollout,
    /// back-propagate. `cancelled` is polled at selection entry and before
    /// back-propagation so a cancelled iteration can be discarded cleanly.
    pub fn iterate(&self, game: &Game, generator: &ActionGenerator, rng: &mut impl Rng, cancelled: &dyn Fn() -> bool) {
        let guard = self.inner.read();
        let arena = Arc::clone(&guard.arena);
        let root = guard.root;
        drop(guard); // snapshot only; the rest of the iteration runs against `arena` with no lock held

        if cancelled() {
            return;
        }

        let mut path = vec![root];
        arena.get(root).add_virtual_loss(VIRTUAL_LOSS);
        let mut current = root;

        // Selection: descend through fully-expanded, non-terminal nodes.
        while arena.get(current).is_fully_expanded() && !arena.get(current).is_terminal() {
            let Some(next) = self.select_child(&arena, current) else {
                break;
            };
            arena.get(next).add_virtual_loss(VIRTUAL_LOSS);
            path.push(next);
            current = next;
        }

        let leaf = arena.get(current);
        let rollout_from = if leaf.is_terminal() {
            current
        } else if let Some(child) = self.try_expand(&arena, game, generator, current) {
            arena.get(child).add_virtual_loss(VIRTUAL_LOSS);
            path.push(child);
            child
        } else {
            current
        };

        if cancelled() {
            // Still correct the virtual loss so the tree is left consistent.
            for &id in &path {
                arena.get(id).backpropagate(&vec![0.0; N_PLAYERS], VIRTUAL_LOSS);
            }
            return;
        }

        let result = Self::rollout(game, generator, arena.get(rollout_from), rng);

        for &id in &path {
            arena.get(id).backpropagate(&result, VIRTUAL_LOSS);
        }
    }

    fn select_child(&self, arena: &Arena, parent_id: NodeId) -> Option<NodeId> {
        let parent = arena.get(parent_id);
        let parent_visits = parent.visit_count().max(1) as f64;
        let mover = parent.player_to_move;

        let mut best: Option<Candidate> = None;
        for (action_idx, child_id) in parent.children.read().iter().copied() {
            let child = arena.get(child_id);
            let visits = child.visit_count().max(0);
            let score = if visits == 0 {
                f64::INFINITY
            } else {
                let q = child.value_sum_for(mover) / visits as f64;
                let exploration = self.exploration_c * (parent_visits.ln() / visits as f64).sqrt();
                q + exploration
            };

            let better = match &best {
                None => true,
                Some(current_best) => {
                    score > current_best.score || (score == current_best.score && action_idx < current_best.action_idx)
                }
            };
            if better {
                best = Some(Candidate {
                    action_idx,
                    node: child_id,
                    score,
                });
            }
        }
        best.map(|c| c.node)
    }

    /// Claims the next untried action (if any) and budget allows it,
    /// allocates exactly one new child. Returns `None` if there was
    /// nothing to expand or the memory budget declined the allocation.
    fn try_expand(&self, arena: &Arena, game: &Game, generator: &ActionGenerator, parent_id: NodeId) -> Option<NodeId> {
        let parent = arena.get(parent_id);
        let idx = parent.next_untried.fetch_add(1, Ordering::AcqRel);
        if idx >= parent.legal_actions.len() {
            return None;
        }
        let action = parent.legal_actions[idx];

        let estimated_bytes = Node::estimated_bytes(game, &parent.state, generator);
        if !arena.try_reserve(estimated_bytes) {
            return None;
        }

        let mut child_state = parent.state.clone();
        let result = game.take_action(&mut child_state, &action);
        let next_mover = game.next_player(&child_state);
        let child = Node::new(child_state, Some(parent_id), Some(action), next_mover, result, generator);
        let child_id = arena.push(child);

        parent.children.write().push((idx as u32, child_id));
        Some(child_id)
    }

    fn rollout(game: &Game, generator: &ActionGenerator, from: &Node, rng: &mut impl Rng) -> Vec<f64> {
        if let Some(result) = &from.terminal_result {
            return result.clone();
        }

        let mut state = from.state.clone();
        loop {
            let cursor = generator.init_data(&state);
            let actions = cursor.collect_canonical(generator);
            let Some(&action) = actions.get(rng.gen_range(0..actions.len())) else {
                // No legal actions but not flagged terminal: treat as a draw
                // rather than surfacing `IllegalState` out of a rollout.
                return vec![1.0 / N_PLAYERS as f64; N_PLAYERS];
            };
            if let Some(result) = game.take_action(&mut state, &action) {
                return result;
            }
        }
    }

    /// Best-action selection: highest visit_count, ties by mean value, ties
    /// by canonical (smallest action index) order (§4.5).
    pub fn best_action(&self) -> Result<Action, PlayerError> {
        let guard = self.inner.read();
        let arena = &guard.arena;
        let root = arena.get(guard.root);
        let mover = root.player_to_move;

        root.children
            .read()
            .iter()
            .copied()
            .max_by(|(idx_a, a), (idx_b, b)| {
                let (node_a, node_b) = (arena.get(*a), arena.get(*b));
                node_a
                    .visit_count()
                    .cmp(&node_b.visit_count())
                    .then(
                        node_a
                            .mean_value_for(mover)
                            .partial_cmp(&node_b.mean_value_for(mover))
                            .unwrap_or(std::cmp::Ordering::Equal),
                    )
                    .then(idx_b.cmp(idx_a)) // smaller action index wins ties
            })
            .map(|(idx, _)| root.legal_actions[idx as usize])
            .ok_or(PlayerError::IllegalState)
    }

    /// Reparents the tree to the subtree reached by `action`, discarding
    /// everything else and resetting the memory counter to just the
    /// surviving nodes (§4.5 "Update").
    pub fn update(&self, game: &Game, generator: &ActionGenerator, action: Action) {
        let mut guard = self.inner.write();
        let old_arena = Arc::clone(&guard.arena);
        let old_root = old_arena.get(guard.root);

        let new_arena = Arc::new(Arena::new(old_arena.memory_budget()));
        let new_root = match old_root.find_child(action) {
            Some(child_id) => Self::copy_subtree(&old_arena, child_id, &new_arena),
            None => {
                let mut state = old_root.state.clone();
                let result = game.take_action(&mut state, &action);
                let mover = game.next_player(&state);
                new_arena.push(Node::new(state, None, None, mover, result, generator))
            }
        };

        guard.arena = new_arena;
        guard.root = new_root;
    }

    /// Breadth-first copy of `old_root`'s subtree into `new_arena`,
    /// remapping child ids and charging the budget for every copied node.
    /// boxcar's arena has no in-place removal, so pruning is expressed as
    /// "build the kept subtree fresh" rather than compacting in place.
    fn copy_subtree(old_arena: &Arena, old_root: NodeId, new_arena: &Arena) -> NodeId {
        let mut remap = VecDeque::new();
        let root_bytes = std::mem::size_of::<Node>() + old_arena.get(old_root).legal_actions.len() * std::mem::size_of::<Action>();
        new_arena.try_reserve(root_bytes);
        let new_root = new_arena.push(Self::clone_node_shell(old_arena.get(old_root), None, None));
        remap.push_back((old_root, new_root));

        while let Some((old_id, new_id)) = remap.pop_front() {
            let old_node = old_arena.get(old_id);
            let mut new_children = Vec::new();
            for (action_idx, old_child_id) in old_node.children.read().iter().copied() {
                let old_child = old_arena.get(old_child_id);
                let bytes = std::mem::size_of::<Node>() + old_child.legal_actions.len() * std::mem::size_of::<Action>();
                new_arena.try_reserve(bytes);
                let new_child_id = new_arena.push(Self::clone_node_shell(old_child, Some(new_id), old_child.action_taken));
                new_children.push((action_idx, new_child_id));
                remap.push_back((old_child_id, new_child_id));
            }
            *new_arena.get(new_id).children.write() = new_children;
        }

        new_root
    }

    /// Builds a detached copy of `node`'s own fields (state, counters,
    /// legal actions) under a new parent, without consulting the action
    /// generator again — it already computed `legal_actions` once when the
    /// node was first created.
    fn clone_node_shell(node: &Node, parent: Option<NodeId>, action_taken: Option<Action>) -> Node {
        Node {
            parent,
            action_taken,
            player_to_move: node.player_to_move,
            terminal_result: node.terminal_result.clone(),
            legal_actions: node.legal_actions.clone(),
            next_untried: AtomicUsize::new(node.next_untried.load(Ordering::Relaxed)),
            children: RwLock::new(Vec::new()),
            visit_count: AtomicI64::new(node.visit_count()),
            value_sum: [
                AtomicI64::new(node.value_sum[0].load(Ordering::Relaxed)),
                AtomicI64::new(node.value_sum[1].load(Ordering::Relaxed)),
            ],
            state: node.state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{Game, State};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use serde_json::json;

    fn tic_tac_toe() -> (Game, State, ActionGenerator) {
        let game = Game::create("tic_tac_toe", &json!({})).unwrap();
        let state = State::create(&game, None).unwrap();
        let generator = ActionGenerator::create(&game, "default", &json!({})).unwrap();
        (game, state, generator)
    }

    #[test]
    fn single_threaded_search_finds_a_legal_best_action() {
        let (game, state, generator) = tic_tac_toe();
        let tree = Tree::new(&game, state, &generator, 16 * 1024 * 1024, crate::DEFAULT_EXPLORATION_C);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..200 {
            tree.iterate(&game, &generator, &mut rng, &|| false);
        }
        let action = tree.best_action().unwrap();
        assert!(matches!(action, Action::TicTacToe(_)));
        assert!(tree.node_count() > 1);
    }

    #[test]
    fn same_seed_same_iteration_count_gives_the_same_action() {
        let (game, state, generator) = tic_tac_toe();

        let run = |seed: u64| {
            let (_, state, _) = tic_tac_toe();
            let tree = Tree::new(&game, state, &generator, 16 * 1024 * 1024, crate::DEFAULT_EXPLORATION_C);
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            for _ in 0..100 {
                tree.iterate(&game, &generator, &mut rng, &|| false);
            }
            tree.best_action().unwrap()
        };

        assert_eq!(run(42), run(42));
    }

    #[test]
    fn memory_budget_caps_node_allocation() {
        let (game, state, generator) = tic_tac_toe();
        // Just enough for the root, not enough for any child.
        let root_bytes = Node::estimated_bytes(&game, &state, &generator);
        let tree = Tree::new(&game, state, &generator, root_bytes + 8, crate::DEFAULT_EXPLORATION_C);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..50 {
            tree.iterate(&game, &generator, &mut rng, &|| false);
        }
        assert_eq!(tree.node_count(), 1);
        assert!(tree.bytes_used() <= root_bytes + 8);
    }

    #[test]
    fn update_reparents_to_the_surviving_child_and_keeps_its_statistics() {
        let (game, state, generator) = tic_tac_toe();
        let tree = Tree::new(&game, state, &generator, 16 * 1024 * 1024, crate::DEFAULT_EXPLORATION_C);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        for _ in 0..200 {
            tree.iterate(&game, &generator, &mut rng, &|| false);
        }
        let action = tree.best_action().unwrap();
        let visits_before = {
            let guard = tree.inner.read();
            let root = guard.arena.get(guard.root);
            let (_, child_id) = root.children.read().iter().copied().find(|(idx, _)| root.legal_actions[*idx as usize] == action).unwrap();
            guard.arena.get(child_id).visit_count()
        };

        tree.update(&game, &generator, action);

        let guard = tree.inner.read();
        let new_root = guard.arena.get(guard.root);
        assert_eq!(new_root.visit_count(), visits_before);
        assert_eq!(new_root.action_taken, Some(action));
        assert_eq!(new_root.parent, None);
    }

    #[test]
    fn update_off_tree_action_starts_a_fresh_root() {
        let (game, state, generator) = tic_tac_toe();
        let tree = Tree::new(&game, state, &generator, 16 * 1024 * 1024, crate::DEFAULT_EXPLORATION_C);
        // No iterations run: the root has no children yet, so any action is
        // "off tree" and must fall back to building a fresh root node.
        let action = {
            let guard = tree.inner.read();
            let root = guard.arena.get(guard.root);
            generator.first(&generator.init_data(&root.state)).unwrap()
        };

        tree.update(&game, &generator, action);

        let guard = tree.inner.read();
        let new_root = guard.arena.get(guard.root);
        assert_eq!(new_root.visit_count(), 0);
        assert_eq!(guard.arena.len(), 1);
    }
}
