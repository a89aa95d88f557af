//! Neural Network Architectures
//!
//! Shared window encoder with forecast, policy and value heads.

pub mod encoder;
pub mod policy_value;

pub use encoder::{WindowEncoder, WindowEncoderConfig};
pub use policy_value::{
    tensor_to_vec, windows_to_tensor, PolicyValueModel, PolicyValueNet, PolicyValueNetConfig,
    PolicyValueOutput,
};
