//! RL Algorithms
//!
//! Policy optimization algorithms for the trading agent.

pub mod a2c;

pub use a2c::{
    a2c_loss, a2c_update, compute_advantages, discounted_returns, normalize_advantages, A2CLoss,
    UpdateOutcome, UpdateStats,
};
