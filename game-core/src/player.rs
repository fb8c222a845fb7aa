use std::time::Duration;

use crate::error::PlayerError;
use crate::game::Action;

/// A decision-making agent bound to one state (§4.4).
///
/// The state machine is `Idle -> start_thinking -> Thinking -> stop_thinking
/// -> Idle`. `get_best_action` is legal in either state; `update` is legal
/// in either state and, while `Thinking`, must pause background work across
/// the mutation (see each implementor's `update`).
pub trait Player: Send {
    fn name(&self) -> &str;

    /// Idempotent. Transitions `Idle -> Thinking` and launches background
    /// work; a call while already `Thinking` is a no-op.
    fn start_thinking(&mut self);

    /// Idempotent and fast: joins background workers before returning.
    fn stop_thinking(&mut self);

    /// If `Thinking`, keeps searching until `deadline` elapses then stops.
    /// If `Idle`, performs one bounded synchronous search for `deadline`
    /// (or an implementation-chosen default when absent). Never returns an
    /// action for which `Game::is_valid_action` is false.
    fn get_best_action(&mut self, deadline: Option<Duration>) -> Result<Action, PlayerError>;

    /// Notifies the player that `action` was played through `TakeAction`.
    fn update(&mut self, action: Action);
}
