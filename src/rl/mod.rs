//! Reinforcement Learning Module
//!
//! Forecast-then-trade agent built on the Burn framework.
//!
//! # Features
//!
//! - **Environment**: Replay of scaled price windows with sell/hold/buy positions
//! - **Network**: Shared window encoder with forecast, policy and value heads
//! - **Algorithms**: Forecast pretraining followed by A2C (Advantage Actor-Critic)
//! - **Evaluation**: Raw-unit forecast metrics and a greedy backtest

pub mod algorithms;
pub mod config;
pub mod core;
pub mod environment;
pub mod memory;
pub mod networks;
pub mod training;

// Config exports
pub use config::{A2CConfig, PretrainConfig};

// Core exports
pub use core::{ActionSampler, CategoricalSampler, GreedySampler, TradeAction, NUM_ACTIONS};

// Environment exports
pub use environment::{Environment, EpisodeStatus, StepInfo, StepResult, TradingEnvConfig, TradingEnvironment};

// Memory exports
pub use memory::Rollout;

// Network exports
pub use networks::{PolicyValueModel, PolicyValueNet, PolicyValueNetConfig, PolicyValueOutput};

// Algorithm exports
pub use algorithms::{a2c_update, UpdateOutcome, UpdateStats};

// Training exports
pub use training::{
    adam_optimizer, pretrain, ActorCriticTrainer, Checkpointer, EpisodeResult, ParameterStore,
    RunReport, TrainerPhase,
};
