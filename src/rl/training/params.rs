//! Shared Parameter Store
//!
//! Owns the policy-value network and its optimizer state. Both the
//! pretraining and actor-critic phases mutate the parameters only through
//! [`ParameterStore::apply_gradients`], and neither may assume the other has
//! or has not run.

use std::marker::PhantomData;

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::rl::networks::PolicyValueModel;

/// Adam optimizer, optionally clipping the gradient norm
pub fn adam_optimizer<B, M>(max_grad_norm: Option<f32>) -> impl Optimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut config = AdamConfig::new();
    if let Some(norm) = max_grad_norm {
        config = config.with_grad_clipping(Some(GradientClippingConfig::Norm(norm)));
    }
    config.init::<B, M>()
}

/// Model parameters plus optimizer state
pub struct ParameterStore<B, M, O>
where
    B: AutodiffBackend,
    M: PolicyValueModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    model: M,
    optimizer: O,
    device: B::Device,
    updates: usize,
    _backend: PhantomData<B>,
}

impl<B, M, O> ParameterStore<B, M, O>
where
    B: AutodiffBackend,
    M: PolicyValueModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    pub fn new(model: M, optimizer: O, device: B::Device) -> Self {
        Self {
            model,
            optimizer,
            device,
            updates: 0,
            _backend: PhantomData,
        }
    }

    /// Read-only view for forward passes
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Gradient steps applied so far, across both phases
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Backpropagate `loss` and take one optimizer step
    pub fn apply_gradients(&mut self, loss: Tensor<B, 1>, lr: f64) {
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optimizer.step(lr, self.model.clone(), grads);
        self.updates += 1;
    }

    pub fn into_model(self) -> M {
        self.model
    }
}
