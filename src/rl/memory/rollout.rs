//! Episode Rollout
//!
//! On-policy storage for one episode of transitions. Built step by step
//! during collection and consumed whole by the actor-critic update.

use crate::data::Window;

/// Transitions of a single episode, in chronological order
#[derive(Debug, Clone, Default)]
pub struct Rollout {
    pub observations: Vec<Window>,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    /// Critic estimates made while collecting
    pub values: Vec<f32>,
    pub dones: Vec<bool>,
}

impl Rollout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            dones: Vec::with_capacity(capacity),
        }
    }

    /// Append one transition
    pub fn push(&mut self, observation: Window, action: usize, reward: f32, value: f32, done: bool) {
        self.observations.push(observation);
        self.actions.push(action);
        self.rewards.push(reward);
        self.values.push(value);
        self.dones.push(done);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Undiscounted sum of rewards
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }

    /// Whether the last stored transition ended the episode
    pub fn is_complete(&self) -> bool {
        self.dones.last().copied().unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.observations.clear();
        self.actions.clear();
        self.rewards.clear();
        self.values.clear();
        self.dones.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_clear() {
        let mut rollout = Rollout::new();
        assert!(rollout.is_empty());
        assert!(!rollout.is_complete());

        rollout.push(Window::zeros(2, 1), 2, 1.5, 0.1, false);
        rollout.push(Window::zeros(2, 1), 0, -0.5, 0.2, true);

        assert_eq!(rollout.len(), 2);
        assert_eq!(rollout.total_reward(), 1.0);
        assert!(rollout.is_complete());

        rollout.clear();
        assert!(rollout.is_empty());
    }
}
