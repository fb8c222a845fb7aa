use std::num::NonZeroUsize;
use std::time::Duration;

use serde_json::Value;

use game_core::GameError;

/// Default exploration constant `c` in the UCT formula `q/n + c*sqrt(ln(N)/n)`,
/// the standard choice for rewards scaled to `[0, 1]` (§4.5 "UCT").
pub const DEFAULT_EXPLORATION_C: f64 = std::f64::consts::SQRT_2;

const DEFAULT_MEMORY_BUDGET: usize = 256 * 1024 * 1024;
const DEFAULT_THINK_TIME: Duration = Duration::from_secs(1);

/// Tunables for one [`crate::MCTSPlayer`] (§4.5 "Config").
#[derive(Debug, Clone)]
pub struct MCTSOptions {
    /// Kind of action generator to bind to (e.g. `"default"`).
    pub action_generator: String,
    /// How long `GetBestAction` is allowed to think before returning,
    /// absent an earlier deadline from the caller.
    pub think_time: Duration,
    /// Ceiling on the arena's total node storage, in bytes.
    pub memory_budget: usize,
    /// Number of worker threads searching the shared tree concurrently.
    pub thread_count: NonZeroUsize,
    /// Exploration constant `c` used by every worker's UCT selection.
    pub exploration_c: f64,
    /// Seeds every worker's RNG from one base value so a run is
    /// reproducible end to end.
    pub seed: u64,
}

impl MCTSOptions {
    /// `data` carries the `add_player` request's `data` object: an
    /// optional `actionGenerator: {type, data}` (same shape `RandomPlayer`
    /// reads, defaulting to `{"type": "default"}` when absent), plus the
    /// MCTS tunables below.
    pub fn from_json(data: &Value) -> Result<Self, GameError> {
        let action_generator = data
            .get("actionGenerator")
            .and_then(|v| v.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();

        let think_time = data
            .get("thinkTimeMs")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_THINK_TIME);

        let memory_budget = data
            .get("memoryBudget")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MEMORY_BUDGET);

        let thread_count = data
            .get("threadCount")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .and_then(NonZeroUsize::new)
            .unwrap_or_else(Self::default_thread_count);

        let exploration_c = data.get("explorationC").and_then(Value::as_f64).unwrap_or(DEFAULT_EXPLORATION_C);

        let seed = data.get("seed").and_then(Value::as_u64).unwrap_or_else(rand::random);

        if memory_budget == 0 {
            return Err(GameError::SchemaViolation("memoryBudget must be greater than zero".to_string()));
        }

        Ok(Self {
            action_generator,
            think_time,
            memory_budget,
            thread_count,
            exploration_c,
            seed,
        })
    }

    fn default_thread_count() -> NonZeroUsize {
        std::thread::available_parallelism().unwrap_or(NonZeroUsize::new(4).unwrap())
    }
}

impl Default for MCTSOptions {
    fn default() -> Self {
        Self {
            action_generator: "default".to_string(),
            think_time: DEFAULT_THINK_TIME,
            memory_budget: DEFAULT_MEMORY_BUDGET,
            thread_count: Self::default_thread_count(),
            exploration_c: DEFAULT_EXPLORATION_C,
            seed: rand::random(),
        }
    }
}
