//! Experience Storage
//!
//! Per-episode rollouts for on-policy actor-critic updates.

pub mod rollout;

pub use rollout::Rollout;
