//! RL Configuration
//!
//! Hyperparameters of the pretraining and actor-critic phases.

use serde::{Deserialize, Serialize};

/// Forecast pretraining hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PretrainConfig {
    /// Learning rate
    pub lr: f64,
    /// Passes over the training windows
    pub epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Seed for minibatch shuffling
    pub seed: u64,
}

impl Default for PretrainConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            epochs: 10,
            batch_size: 32,
            seed: 42,
        }
    }
}

/// Advantage actor-critic hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct A2CConfig {
    /// Learning rate
    pub lr: f64,
    /// Discount factor (gamma)
    pub gamma: f32,
    /// Value function coefficient
    pub value_coef: f32,
    /// Entropy bonus coefficient
    pub entropy_coef: f32,
    /// Standardize advantages within each episode
    pub normalize_advantages: bool,
    /// Maximum gradient norm for clipping
    pub max_grad_norm: Option<f32>,
    /// Number of training episodes
    pub episodes: usize,
    /// Episodes between progress logs
    pub log_interval: usize,
    /// Seed for action sampling
    pub seed: u64,
}

impl Default for A2CConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            gamma: 0.99,
            value_coef: 0.5,
            entropy_coef: 0.0,
            normalize_advantages: false,
            max_grad_norm: None,
            episodes: 100,
            log_interval: 10,
            seed: 42,
        }
    }
}
