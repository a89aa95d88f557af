//! Advantage Actor-Critic (A2C)
//!
//! Monte-Carlo returns over a complete episode, advantages against the
//! critic baseline, and one combined policy/value gradient step per episode.

use burn::prelude::*;
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, TensorData};
use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TrainingError;
use crate::rl::config::A2CConfig;
use crate::rl::memory::Rollout;
use crate::rl::networks::{tensor_to_vec, windows_to_tensor, PolicyValueModel};
use crate::rl::training::ParameterStore;

/// Discounted return of every step, computed backwards from the last reward
///
/// `R[last] = r[last]` and `R[t] = r[t] + gamma * R[t + 1]`; nothing is
/// bootstrapped past the end of the episode.
pub fn discounted_returns(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0f32; rewards.len()];
    let mut running = 0.0f32;

    for t in (0..rewards.len()).rev() {
        running = rewards[t] + gamma * running;
        returns[t] = running;
    }

    returns
}

/// `advantage[t] = return[t] - value[t]`
pub fn compute_advantages(returns: &[f32], values: &[f32]) -> Result<Vec<f32>, TrainingError> {
    if returns.len() != values.len() {
        return Err(TrainingError::ShapeMismatch(format!(
            "{} returns but {} value estimates",
            returns.len(),
            values.len()
        )));
    }

    Ok(returns.iter().zip(values).map(|(r, v)| r - v).collect())
}

/// Standardize to zero mean and unit variance; no-op below two samples
pub fn normalize_advantages(advantages: &mut [f32]) {
    let n = advantages.len();
    if n < 2 {
        return;
    }

    let mean: f32 = advantages.iter().sum::<f32>() / n as f32;
    let var: f32 = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n as f32;
    let std = var.sqrt().max(1e-8);

    for adv in advantages.iter_mut() {
        *adv = (*adv - mean) / std;
    }
}

/// Combined loss of one rollout plus its scalar components
#[derive(Debug, Clone)]
pub struct A2CLoss<B: Backend> {
    /// policy + value_coef * value - entropy_coef * entropy
    pub total: Tensor<B, 1>,
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
    /// Largest gap between recomputed and collected value estimates
    pub value_drift: f32,
}

/// Build the actor-critic loss from a fresh forward pass over the rollout
///
/// Advantages enter as constant weights, so no gradient flows through
/// the return computation.
pub fn a2c_loss<B: Backend, M: PolicyValueModel<B>>(
    model: &M,
    rollout: &Rollout,
    returns: &[f32],
    advantages: &[f32],
    config: &A2CConfig,
    device: &B::Device,
) -> Result<A2CLoss<B>, TrainingError> {
    let n = rollout.len();
    if n == 0 || returns.len() != n || advantages.len() != n {
        return Err(TrainingError::ShapeMismatch(format!(
            "rollout of {} steps with {} returns and {} advantages",
            n,
            returns.len(),
            advantages.len()
        )));
    }

    let observations = windows_to_tensor::<B>(&rollout.observations, device)?;
    let output = model.forward(observations);

    let log_probs = log_softmax(output.logits, 1);
    let actions: Vec<i64> = rollout.actions.iter().map(|&a| a as i64).collect();
    let actions = Tensor::<B, 2, Int>::from_data(TensorData::new(actions, [n, 1]), device);
    let chosen_log_probs = log_probs.clone().gather(1, actions).reshape([n]);

    let advantages = Tensor::<B, 1>::from_data(TensorData::new(advantages.to_vec(), [n]), device);
    let policy_loss = (chosen_log_probs.neg() * advantages).mean();

    let values = output.value.reshape([n]);
    let value_drift = tensor_to_vec(values.clone())?
        .iter()
        .zip(&rollout.values)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);

    let returns = Tensor::<B, 1>::from_data(TensorData::new(returns.to_vec(), [n]), device);
    let value_loss = (returns - values).powf_scalar(2.0).mean();

    let entropy = (log_probs.clone().exp() * log_probs).sum_dim(1).neg().mean();

    let total = policy_loss.clone() + value_loss.clone().mul_scalar(config.value_coef)
        - entropy.clone().mul_scalar(config.entropy_coef);

    Ok(A2CLoss {
        total,
        policy_loss: policy_loss.into_scalar().elem::<f32>(),
        value_loss: value_loss.into_scalar().elem::<f32>(),
        entropy: entropy.into_scalar().elem::<f32>(),
        value_drift,
    })
}

/// Diagnostics of an applied update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStats {
    pub total_loss: f32,
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
    pub mean_advantage: f32,
    pub value_drift: f32,
}

/// What happened at the end of an episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UpdateOutcome {
    /// One gradient step was applied
    Applied(UpdateStats),
    /// Zero-length rollout; parameters untouched
    Skipped,
}

impl UpdateOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn stats(&self) -> Option<&UpdateStats> {
        match self {
            Self::Applied(stats) => Some(stats),
            Self::Skipped => None,
        }
    }
}

/// Apply one actor-critic update for a completed episode
///
/// Non-finite returns, advantages or loss abort with `TrainingDiverged`
/// before any parameter is written.
pub fn a2c_update<B, M, O>(
    store: &mut ParameterStore<B, M, O>,
    rollout: &Rollout,
    config: &A2CConfig,
    episode: usize,
) -> Result<UpdateOutcome, TrainingError>
where
    B: AutodiffBackend,
    M: PolicyValueModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    if rollout.is_empty() {
        warn!("Episode {} produced no transitions, skipping update", episode);
        return Ok(UpdateOutcome::Skipped);
    }

    let returns = discounted_returns(&rollout.rewards, config.gamma);
    let mut advantages = compute_advantages(&returns, &rollout.values)?;

    if let Some(bad) = returns.iter().chain(&advantages).find(|x| !x.is_finite()) {
        return Err(TrainingError::TrainingDiverged {
            phase: "actor-critic",
            step: episode,
            loss: *bad,
        });
    }

    let mean_advantage = advantages.iter().sum::<f32>() / advantages.len() as f32;
    if config.normalize_advantages {
        normalize_advantages(&mut advantages);
    }

    let device = store.device().clone();
    let loss = a2c_loss(store.model(), rollout, &returns, &advantages, config, &device)?;
    let total_loss = loss.total.clone().into_scalar().elem::<f32>();

    if !total_loss.is_finite() {
        return Err(TrainingError::TrainingDiverged {
            phase: "actor-critic",
            step: episode,
            loss: total_loss,
        });
    }

    debug!(
        episode,
        total_loss,
        policy_loss = loss.policy_loss,
        value_loss = loss.value_loss,
        value_drift = loss.value_drift,
        "a2c update"
    );

    store.apply_gradients(loss.total, config.lr);

    Ok(UpdateOutcome::Applied(UpdateStats {
        total_loss,
        policy_loss: loss.policy_loss,
        value_loss: loss.value_loss,
        entropy: loss.entropy,
        mean_advantage,
        value_drift: loss.value_drift,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Window;
    use crate::rl::networks::PolicyValueNetConfig;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_discounted_returns() {
        let returns = discounted_returns(&[1.0, 1.0, 1.0], 0.5);
        assert_close(&returns, &[1.75, 1.5, 1.0]);
    }

    #[test]
    fn test_last_return_is_last_reward() {
        let returns = discounted_returns(&[0.3, -2.0], 0.99);
        assert_eq!(returns[1], -2.0);
        assert!(discounted_returns(&[], 0.99).is_empty());
    }

    #[test]
    fn test_advantages() {
        let advantages = compute_advantages(&[1.75, 1.5, 1.0], &[0.5, 0.5, 0.5]).unwrap();
        assert_close(&advantages, &[1.25, 1.0, 0.5]);
    }

    #[test]
    fn test_advantages_length_mismatch() {
        assert!(compute_advantages(&[1.0, 2.0], &[0.5]).is_err());
    }

    #[test]
    fn test_normalize_advantages() {
        let mut adv = vec![1.0, 2.0, 3.0];
        normalize_advantages(&mut adv);
        let mean: f32 = adv.iter().sum::<f32>() / 3.0;
        assert!(mean.abs() < 1e-6);

        let mut single = vec![4.0];
        normalize_advantages(&mut single);
        assert_eq!(single, vec![4.0]);
    }

    #[test]
    fn test_loss_components_are_finite() {
        let device = Default::default();
        let model = PolicyValueNetConfig::new(3, 2).init::<TestBackend>(&device);

        let mut rollout = Rollout::new();
        for (i, action) in [0usize, 1, 2].into_iter().enumerate() {
            let w = Window::new(vec![i as f32 * 0.1; 6], 3, 2).unwrap();
            rollout.push(w, action, 1.0, 0.0, i == 2);
        }
        let returns = discounted_returns(&rollout.rewards, 0.9);
        let advantages = compute_advantages(&returns, &rollout.values).unwrap();

        let loss = a2c_loss(&model, &rollout, &returns, &advantages, &A2CConfig::default(), &device).unwrap();
        let total = loss.total.into_scalar().elem::<f32>();

        assert!(total.is_finite());
        assert!(loss.value_loss >= 0.0);
        // Uniform-ish initial policy over three actions
        assert!(loss.entropy > 0.0 && loss.entropy <= 3.0f32.ln() + 1e-4);
    }

    #[test]
    fn test_loss_rejects_empty_rollout() {
        let device = Default::default();
        let model = PolicyValueNetConfig::new(3, 2).init::<TestBackend>(&device);
        let result = a2c_loss(&model, &Rollout::new(), &[], &[], &A2CConfig::default(), &device);
        assert!(matches!(result, Err(TrainingError::ShapeMismatch(_))));
    }

    #[test]
    fn test_non_finite_reward_diverges_before_update() {
        use crate::rl::networks::PolicyValueNet;
        use crate::rl::training::adam_optimizer;
        use burn::backend::Autodiff;

        type TrainBackend = Autodiff<TestBackend>;

        let device = Default::default();
        let model = PolicyValueNetConfig::new(3, 2).init::<TrainBackend>(&device);
        let optimizer = adam_optimizer::<TrainBackend, PolicyValueNet<TrainBackend>>(None);
        let mut store = ParameterStore::new(model, optimizer, device);

        let mut rollout = Rollout::new();
        for (i, reward) in [1.0, f32::NAN].into_iter().enumerate() {
            let w = Window::new(vec![0.2; 6], 3, 2).unwrap();
            rollout.push(w, 1, reward, 0.0, i == 1);
        }

        let result = a2c_update(&mut store, &rollout, &A2CConfig::default(), 4);
        assert!(matches!(
            result,
            Err(TrainingError::TrainingDiverged { phase: "actor-critic", step: 4, .. })
        ));
        assert_eq!(store.updates(), 0);

        rollout.rewards[1] = f32::INFINITY;
        assert!(a2c_update(&mut store, &rollout, &A2CConfig::default(), 5).is_err());
        assert_eq!(store.updates(), 0);
    }
}
