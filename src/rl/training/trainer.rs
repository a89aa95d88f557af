//! Actor-Critic Training Loop
//!
//! Episode-level driver: collect one full rollout, then apply one A2C update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::params::ParameterStore;
use crate::error::TrainingError;
use crate::rl::algorithms::{a2c_update, UpdateOutcome};
use crate::rl::config::A2CConfig;
use crate::rl::core::ActionSampler;
use crate::rl::environment::{Environment, TradingEnvironment};
use crate::rl::memory::Rollout;
use crate::rl::networks::{tensor_to_vec, windows_to_tensor, PolicyValueModel};

/// Where the trainer is within an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerPhase {
    Idle,
    Collecting,
    Updating,
}

/// Result of a single training episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub episode: usize,
    /// Undiscounted reward sum
    pub total_reward: f32,
    /// Episode length in steps
    pub length: usize,
    /// Number of position changes
    pub num_trades: usize,
    pub episode_pnl: f64,
    pub update: UpdateOutcome,
}

/// Run the policy through one full episode
///
/// Actions are drawn by `sampler` from `softmax(logits)`. The episode is
/// capped at `n_steps` transitions; exceeding it means the environment never
/// signalled `done`. Collection needs no gradients, so callers holding an
/// autodiff model pass its `valid()` copy.
pub fn collect_rollout<B, M, E, S>(
    model: &M,
    env: &mut E,
    sampler: &mut S,
    device: &B::Device,
) -> Result<Rollout, TrainingError>
where
    B: Backend,
    M: PolicyValueModel<B>,
    E: Environment + ?Sized,
    S: ActionSampler + ?Sized,
{
    let mut observation = env.reset();
    let budget = env.n_steps();
    let mut rollout = Rollout::with_capacity(budget.saturating_sub(1));

    if env.is_done() {
        return Ok(rollout);
    }

    loop {
        if rollout.len() >= budget {
            return Err(TrainingError::EpisodeOverrun { budget });
        }

        let input = windows_to_tensor::<B>(std::slice::from_ref(&observation), device)?;
        let output = model.forward(input);
        let probs = tensor_to_vec(softmax(output.logits, 1))?;
        let value = tensor_to_vec(output.value)?
            .first()
            .copied()
            .ok_or_else(|| TrainingError::ShapeMismatch("empty value output".to_string()))?;

        let action = sampler.sample(&probs)?;
        let step = env.step(action)?;

        rollout.push(observation, action, step.reward, value, step.done);

        if step.done {
            break;
        }
        observation = step.observation;
    }

    env.render();
    Ok(rollout)
}

/// Advantage actor-critic trainer over a single environment
pub struct ActorCriticTrainer<S: ActionSampler> {
    config: A2CConfig,
    sampler: S,
    phase: TrainerPhase,
    stop: Option<Arc<AtomicBool>>,
}

impl<S: ActionSampler> ActorCriticTrainer<S> {
    pub fn new(config: A2CConfig, sampler: S) -> Self {
        Self {
            config,
            sampler,
            phase: TrainerPhase::Idle,
            stop: None,
        }
    }

    /// Stop between episodes once `flag` is raised
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn phase(&self) -> TrainerPhase {
        self.phase
    }

    pub fn config(&self) -> &A2CConfig {
        &self.config
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Collect and learn from one episode
    pub fn run_episode<B, M, O>(
        &mut self,
        store: &mut ParameterStore<B, M, O>,
        env: &mut TradingEnvironment,
        episode: usize,
    ) -> Result<EpisodeResult, TrainingError>
    where
        B: AutodiffBackend,
        M: PolicyValueModel<B> + AutodiffModule<B>,
        M::InnerModule: PolicyValueModel<B::InnerBackend>,
        O: Optimizer<M, B>,
    {
        let result = self.collect_and_update(store, env, episode);
        self.phase = TrainerPhase::Idle;
        result
    }

    fn collect_and_update<B, M, O>(
        &mut self,
        store: &mut ParameterStore<B, M, O>,
        env: &mut TradingEnvironment,
        episode: usize,
    ) -> Result<EpisodeResult, TrainingError>
    where
        B: AutodiffBackend,
        M: PolicyValueModel<B> + AutodiffModule<B>,
        M::InnerModule: PolicyValueModel<B::InnerBackend>,
        O: Optimizer<M, B>,
    {
        self.phase = TrainerPhase::Collecting;
        let device = store.device().clone();
        let policy = store.model().valid();
        let rollout = collect_rollout::<B::InnerBackend, M::InnerModule, _, S>(
            &policy,
            env,
            &mut self.sampler,
            &device,
        )?;

        self.phase = TrainerPhase::Updating;
        let update = a2c_update(store, &rollout, &self.config, episode)?;

        Ok(EpisodeResult {
            episode,
            total_reward: rollout.total_reward(),
            length: rollout.len(),
            num_trades: env.num_trades(),
            episode_pnl: env.episode_pnl(),
            update,
        })
    }

    /// Train for up to `episodes` episodes
    ///
    /// The stop flag is only checked between episodes.
    pub fn train_actor_critic<B, M, O>(
        &mut self,
        store: &mut ParameterStore<B, M, O>,
        env: &mut TradingEnvironment,
        episodes: usize,
    ) -> Result<Vec<EpisodeResult>, TrainingError>
    where
        B: AutodiffBackend,
        M: PolicyValueModel<B> + AutodiffModule<B>,
        M::InnerModule: PolicyValueModel<B::InnerBackend>,
        O: Optimizer<M, B>,
    {
        let mut results = Vec::with_capacity(episodes);
        let log_interval = self.config.log_interval.max(1);

        info!("Starting actor-critic training for {} episodes", episodes);

        for episode in 0..episodes {
            if self.stop_requested() {
                info!("Stop requested, ending training after {} episodes", episode);
                break;
            }

            let result = self.run_episode(store, env, episode)?;

            if (episode + 1) % log_interval == 0 || episode + 1 == episodes {
                let recent = &results[results.len().saturating_sub(log_interval - 1)..];
                let avg_reward = (recent.iter().map(|r: &EpisodeResult| r.total_reward).sum::<f32>()
                    + result.total_reward)
                    / (recent.len() + 1) as f32;
                info!(
                    "Episode {}/{}: reward={:.5}, avg_reward={:.5}, trades={}, loss={}",
                    episode + 1,
                    episodes,
                    result.total_reward,
                    avg_reward,
                    result.num_trades,
                    result
                        .update
                        .stats()
                        .map(|s| format!("{:.6}", s.total_loss))
                        .unwrap_or_else(|| "skipped".to_string())
                );
            } else {
                debug!(episode, reward = result.total_reward, "episode finished");
            }

            results.push(result);
        }

        Ok(results)
    }
}

/// Training summary statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub num_episodes: usize,
    /// Episodes whose update was skipped
    pub skipped_updates: usize,
    pub avg_reward: f32,
    pub avg_pnl: f64,
    pub avg_episode_length: f32,
    pub avg_trades: f32,
    /// Mean reward of the last tenth of the episodes
    pub final_avg_reward: f32,
    /// Sum of winning episode PnL over losing; `None` without losses
    pub profit_factor: Option<f64>,
}

/// Summarize training results
pub fn summarize_results(results: &[EpisodeResult]) -> TrainingSummary {
    if results.is_empty() {
        return TrainingSummary::default();
    }

    let n = results.len() as f64;

    let avg_reward: f64 = results.iter().map(|r| r.total_reward as f64).sum::<f64>() / n;
    let avg_pnl: f64 = results.iter().map(|r| r.episode_pnl).sum::<f64>() / n;
    let avg_length: f64 = results.iter().map(|r| r.length as f64).sum::<f64>() / n;
    let avg_trades: f64 = results.iter().map(|r| r.num_trades as f64).sum::<f64>() / n;

    let tail = (results.len() / 10).max(1);
    let final_avg_reward = results[results.len() - tail..]
        .iter()
        .map(|r| r.total_reward)
        .sum::<f32>()
        / tail as f32;

    let total_wins: f64 = results.iter().filter(|r| r.episode_pnl > 0.0).map(|r| r.episode_pnl).sum();
    let total_losses: f64 = results.iter().filter(|r| r.episode_pnl < 0.0).map(|r| -r.episode_pnl).sum();
    let profit_factor = if total_losses > 0.0 { Some(total_wins / total_losses) } else { None };

    TrainingSummary {
        num_episodes: results.len(),
        skipped_updates: results.iter().filter(|r| r.update.is_skipped()).count(),
        avg_reward: avg_reward as f32,
        avg_pnl,
        avg_episode_length: avg_length as f32,
        avg_trades: avg_trades as f32,
        final_avg_reward,
        profit_factor,
    }
}
