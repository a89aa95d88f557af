//! Action Sampling
//!
//! Turns policy probabilities into action indices. Training samples from
//! the categorical distribution; evaluation can take the argmax.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::TrainingError;

/// Picks an action index from a probability vector
pub trait ActionSampler {
    fn sample(&mut self, probs: &[f32]) -> Result<usize, TrainingError>;
}

/// Samples from the categorical distribution defined by the probabilities
#[derive(Debug, Clone)]
pub struct CategoricalSampler<R: Rng = StdRng> {
    rng: R,
}

impl CategoricalSampler<StdRng> {
    /// Deterministic sampler for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> CategoricalSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ActionSampler for CategoricalSampler<R> {
    fn sample(&mut self, probs: &[f32]) -> Result<usize, TrainingError> {
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(TrainingError::Sampling {
                probs: probs.to_vec(),
            });
        }

        let dist = WeightedIndex::new(probs).map_err(|_| TrainingError::Sampling {
            probs: probs.to_vec(),
        })?;
        Ok(dist.sample(&mut self.rng))
    }
}

/// Always picks the most probable action
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySampler;

impl ActionSampler for GreedySampler {
    fn sample(&mut self, probs: &[f32]) -> Result<usize, TrainingError> {
        probs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .ok_or_else(|| TrainingError::Sampling {
                probs: probs.to_vec(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_sampler_is_reproducible() {
        let probs = [0.2, 0.3, 0.5];
        let mut a = CategoricalSampler::seeded(42);
        let mut b = CategoricalSampler::seeded(42);

        let xs: Vec<usize> = (0..20).map(|_| a.sample(&probs).unwrap()).collect();
        let ys: Vec<usize> = (0..20).map(|_| b.sample(&probs).unwrap()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_sampler_respects_zero_probability() {
        let mut sampler = CategoricalSampler::seeded(1);
        for _ in 0..100 {
            assert_ne!(sampler.sample(&[0.5, 0.0, 0.5]).unwrap(), 1);
        }
    }

    #[test]
    fn test_sampler_frequencies_follow_probabilities() {
        let mut sampler = CategoricalSampler::seeded(3);
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            counts[sampler.sample(&[0.1, 0.1, 0.8]).unwrap()] += 1;
        }
        assert!(counts[2] > counts[0] * 4);
    }

    #[test]
    fn test_sampler_rejects_degenerate_probabilities() {
        let mut sampler = CategoricalSampler::seeded(0);
        assert!(sampler.sample(&[0.0, 0.0, 0.0]).is_err());
        assert!(sampler.sample(&[f32::NAN, 0.5, 0.5]).is_err());
    }

    #[test]
    fn test_greedy_picks_argmax() {
        assert_eq!(GreedySampler.sample(&[0.1, 0.7, 0.2]).unwrap(), 1);
    }
}
