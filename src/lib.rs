pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod rl;

pub use config::AppConfig;
pub use error::{EnvError, FxError, Result, TrainingError};
pub use pipeline::{run_evaluation, run_training, Evaluation};
