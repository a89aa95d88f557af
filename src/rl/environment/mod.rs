//! Simulated Trading Environment for RL Training
//!
//! This module provides a gym-like environment that replays historical
//! windows so the agent can be trained without risking real capital.

mod trading;
mod traits;

pub use traits::Environment;
pub use trading::{EpisodeStatus, StepInfo, StepResult, TradingEnvConfig, TradingEnvironment};
