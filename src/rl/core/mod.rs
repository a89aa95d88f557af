//! Core RL Types
//!
//! Action space and action sampling shared by the environment and trainer.

pub mod action;
pub mod sampler;

pub use action::{TradeAction, NUM_ACTIONS};
pub use sampler::{ActionSampler, CategoricalSampler, GreedySampler};
