//! Window Encoder Network
//!
//! Flattens a feature window and encodes it into the latent representation
//! shared by the forecast, policy and value heads.

use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Hidden dimension for encoder layers
pub const ENCODER_HIDDEN_DIM: usize = 128;

/// Output dimension of encoder (latent state)
pub const ENCODER_OUTPUT_DIM: usize = 64;

/// Window encoder configuration
#[derive(Config, Debug)]
pub struct WindowEncoderConfig {
    /// Time steps per window
    pub seq_len: usize,
    /// Features per time step
    pub n_features: usize,
    /// Hidden layer dimension
    #[config(default = "ENCODER_HIDDEN_DIM")]
    pub hidden_dim: usize,
    /// Output dimension (latent representation)
    #[config(default = "ENCODER_OUTPUT_DIM")]
    pub output_dim: usize,
}

/// Window encoder neural network
#[derive(Module, Debug)]
pub struct WindowEncoder<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    activation: Relu,
}

impl WindowEncoderConfig {
    /// Initialize the encoder network
    pub fn init<B: Backend>(&self, device: &B::Device) -> WindowEncoder<B> {
        let input_dim = self.seq_len * self.n_features;
        let fc1 = LinearConfig::new(input_dim, self.hidden_dim).init(device);
        let fc2 = LinearConfig::new(self.hidden_dim, self.hidden_dim / 2).init(device);
        let fc3 = LinearConfig::new(self.hidden_dim / 2, self.output_dim).init(device);

        WindowEncoder {
            fc1,
            fc2,
            fc3,
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> WindowEncoder<B> {
    /// Forward pass: `[batch, seq_len, n_features]` -> `[batch, output_dim]`
    pub fn forward(&self, windows: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, seq_len, n_features] = windows.dims();
        let x = windows.reshape([batch, seq_len * n_features]);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.fc2.forward(x);
        let x = self.activation.forward(x);
        let x = self.fc3.forward(x);
        self.activation.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_encoder_forward() {
        let device = Default::default();
        let encoder = WindowEncoderConfig::new(10, 5).init::<TestBackend>(&device);

        // Batch of 4 windows
        let input = Tensor::<TestBackend, 3>::zeros([4, 10, 5], &device);
        let output = encoder.forward(input);

        assert_eq!(output.dims(), [4, ENCODER_OUTPUT_DIM]);
    }
}
