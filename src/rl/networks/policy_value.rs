//! Policy-Value Network
//!
//! One shared window encoder feeding three heads: the price forecast, the
//! action logits and the state value. Training code only relies on the
//! [`PolicyValueModel`] trait, so any topology with the same output shapes
//! can be substituted.

use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::TensorData;

use super::encoder::{WindowEncoder, WindowEncoderConfig, ENCODER_HIDDEN_DIM, ENCODER_OUTPUT_DIM};
use crate::data::Window;
use crate::error::TrainingError;
use crate::rl::core::NUM_ACTIONS;

/// Outputs of one forward pass, batch dimension first
#[derive(Debug, Clone)]
pub struct PolicyValueOutput<B: Backend> {
    /// Scaled price forecast `[batch, 1]`
    pub forecast: Tensor<B, 2>,
    /// Unnormalized action scores `[batch, NUM_ACTIONS]`
    pub logits: Tensor<B, 2>,
    /// State value estimate `[batch, 1]`
    pub value: Tensor<B, 2>,
}

/// Forward contract shared by pretraining, actor-critic and evaluation
pub trait PolicyValueModel<B: Backend>: Module<B> {
    /// `[batch, seq_len, n_features]` windows -> forecast, logits, value
    fn forward(&self, windows: Tensor<B, 3>) -> PolicyValueOutput<B>;
}

/// Policy-value network configuration
#[derive(Config, Debug)]
pub struct PolicyValueNetConfig {
    /// Time steps per window
    pub seq_len: usize,
    /// Features per time step
    pub n_features: usize,
    /// Hidden dimension of the encoder
    #[config(default = "ENCODER_HIDDEN_DIM")]
    pub hidden_dim: usize,
    /// Latent dimension shared by all heads
    #[config(default = "ENCODER_OUTPUT_DIM")]
    pub latent_dim: usize,
}

/// Forecast network with policy and value heads on its latent state
#[derive(Module, Debug)]
pub struct PolicyValueNet<B: Backend> {
    encoder: WindowEncoder<B>,
    forecast_head: Linear<B>,
    policy_head: Linear<B>,
    value_head: Linear<B>,
}

impl PolicyValueNetConfig {
    /// Initialize the network
    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyValueNet<B> {
        let encoder = WindowEncoderConfig::new(self.seq_len, self.n_features)
            .with_hidden_dim(self.hidden_dim)
            .with_output_dim(self.latent_dim)
            .init(device);

        PolicyValueNet {
            encoder,
            forecast_head: LinearConfig::new(self.latent_dim, 1).init(device),
            policy_head: LinearConfig::new(self.latent_dim, NUM_ACTIONS).init(device),
            value_head: LinearConfig::new(self.latent_dim, 1).init(device),
        }
    }
}

impl<B: Backend> PolicyValueModel<B> for PolicyValueNet<B> {
    fn forward(&self, windows: Tensor<B, 3>) -> PolicyValueOutput<B> {
        let latent = self.encoder.forward(windows);

        PolicyValueOutput {
            forecast: self.forecast_head.forward(latent.clone()),
            logits: self.policy_head.forward(latent.clone()),
            value: self.value_head.forward(latent),
        }
    }
}

/// Stack windows into a `[batch, seq_len, n_features]` tensor
pub fn windows_to_tensor<B: Backend>(windows: &[Window], device: &B::Device) -> Result<Tensor<B, 3>, TrainingError> {
    let first = windows
        .first()
        .ok_or_else(|| TrainingError::ShapeMismatch("cannot batch zero windows".to_string()))?;
    let (seq_len, n_features) = (first.seq_len(), first.n_features());

    let mut flat = Vec::with_capacity(windows.len() * seq_len * n_features);
    for w in windows {
        if w.seq_len() != seq_len || w.n_features() != n_features {
            return Err(TrainingError::ShapeMismatch(format!(
                "window {}x{} in a batch of {}x{}",
                w.seq_len(),
                w.n_features(),
                seq_len,
                n_features
            )));
        }
        flat.extend_from_slice(w.as_slice());
    }

    Ok(Tensor::from_data(
        TensorData::new(flat, [windows.len(), seq_len, n_features]),
        device,
    ))
}

/// Read a float tensor back into a flat vector
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, TrainingError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| TrainingError::TensorData(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let net = PolicyValueNetConfig::new(8, 5).init::<TestBackend>(&device);

        let windows: Vec<Window> = (0..3).map(|_| Window::zeros(8, 5)).collect();
        let input = windows_to_tensor::<TestBackend>(&windows, &device).unwrap();
        let out = net.forward(input);

        assert_eq!(out.forecast.dims(), [3, 1]);
        assert_eq!(out.logits.dims(), [3, NUM_ACTIONS]);
        assert_eq!(out.value.dims(), [3, 1]);
    }

    #[test]
    fn test_windows_to_tensor_layout() {
        let device = Default::default();
        let w = Window::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let t = windows_to_tensor::<TestBackend>(&[w.clone(), w], &device).unwrap();

        assert_eq!(t.dims(), [2, 2, 2]);
        assert_eq!(tensor_to_vec(t).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_windows_to_tensor_rejects_mixed_shapes() {
        let device = Default::default();
        let batch = [Window::zeros(2, 2), Window::zeros(3, 2)];
        assert!(windows_to_tensor::<TestBackend>(&batch, &device).is_err());
        assert!(windows_to_tensor::<TestBackend>(&[], &device).is_err());
    }
}
