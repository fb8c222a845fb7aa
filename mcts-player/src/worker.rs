use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use game_core::{ActionGenerator, Game};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::tree::Tree;

/// One OS thread continuously running MCTS iterations against a shared
/// [`Tree`] until told to stop (§4.5 "Thread pool"). There is no pause
/// flag, only the `stop` flag that ends the thread for good — a caller
/// that needs the tree to sit still (e.g. before [`Tree::update`]) has to
/// stop and join every worker in the pool first, not merely wait.
pub struct Worker {
    handle: JoinHandle<()>,
}

impl Worker {
    pub fn spawn(tree: Arc<Tree>, game: Game, generator: ActionGenerator, seed: u64, stop: Arc<AtomicBool>) -> Self {
        let handle = std::thread::Builder::new()
            .name("mcts-worker".to_string())
            .spawn(move || {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                while !stop.load(Ordering::Relaxed) {
                    tree.iterate(&game, &generator, &mut rng, &|| stop.load(Ordering::Relaxed));
                }
            })
            .expect("failed to spawn mcts worker thread");
        Self { handle }
    }

    pub fn join(self) {
        let _ = self.handle.join();
    }
}

/// A pool of [`Worker`]s sharing one `stop` flag, derived from a single
/// seed so a run is reproducible end to end (§4.5 "per-worker RNGs seeded
/// from a central sequence").
pub struct WorkerPool {
    workers: Vec<Worker>,
    stop: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn spawn(tree: Arc<Tree>, game: Game, generator: ActionGenerator, thread_count: usize, base_seed: u64) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let workers = (0..thread_count)
            .map(|i| Worker::spawn(Arc::clone(&tree), game, generator, base_seed.wrapping_add(i as u64), Arc::clone(&stop)))
            .collect();
        Self { workers, stop }
    }

    /// Signals all workers to stop and blocks until every thread has exited.
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        for worker in self.workers {
            worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::State;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn pool_grows_the_tree_while_running_and_stops_cleanly_on_shutdown() {
        let game = Game::create("tic_tac_toe", &json!({})).unwrap();
        let state = State::create(&game, None).unwrap();
        let generator = ActionGenerator::create(&game, "default", &json!({})).unwrap();
        let tree = Arc::new(Tree::new(&game, state, &generator, 16 * 1024 * 1024, crate::DEFAULT_EXPLORATION_C));

        let pool = WorkerPool::spawn(Arc::clone(&tree), game, generator, 4, 99);
        std::thread::sleep(Duration::from_millis(50));
        pool.shutdown();

        assert!(tree.node_count() > 1);
        assert!(tree.best_action().is_ok());
    }
}
