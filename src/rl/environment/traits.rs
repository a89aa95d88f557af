//! Episodic environment interface used by rollout collection.

use super::StepResult;
use crate::data::Window;
use crate::error::EnvError;

/// Single-instance episodic environment with discrete actions
///
/// An episode starts with `reset` and runs until a step reports `done`.
/// `n_steps` bounds the number of transitions a well-behaved episode can
/// produce; collectors treat exceeding it as a broken environment.
pub trait Environment {
    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Window;

    /// Apply an action index.
    fn step(&mut self, action: usize) -> Result<StepResult, EnvError>;

    /// Upper bound on transitions per episode.
    fn n_steps(&self) -> usize;

    /// Whether the current episode is terminal.
    fn is_done(&self) -> bool;

    /// Log the current state.
    fn render(&self) {}
}
