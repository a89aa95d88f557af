use thiserror::Error;

/// Main error type for the trading agent
#[derive(Error, Debug)]
pub enum FxError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // Model persistence errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    // Data pipeline errors
    #[error("Invalid price data: {0}")]
    InvalidData(String),

    // Simulation and learning errors
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    #[error("Training error: {0}")]
    Training(#[from] TrainingError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for FxError
pub type Result<T> = std::result::Result<T, FxError>;

/// Contract violations raised by the trading environment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("Invalid action {0}: expected 0 (sell), 1 (hold) or 2 (buy)")]
    InvalidAction(usize),

    #[error("Episode already finished; call reset() before stepping again")]
    StaleEpisode,

    #[error("Episode not started; call reset() before the first step")]
    EpisodeNotStarted,
}

/// Failures of the training loop
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    #[error("Training diverged during {phase} (episode/epoch {step}): loss={loss}")]
    TrainingDiverged {
        phase: &'static str,
        step: usize,
        loss: f32,
    },

    #[error("Cannot sample action from probabilities {probs:?}")]
    Sampling { probs: Vec<f32> },

    #[error("Episode exceeded its step budget of {budget}")]
    EpisodeOverrun { budget: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Tensor data error: {0}")]
    TensorData(String),

    #[error(transparent)]
    Environment(#[from] EnvError),
}
