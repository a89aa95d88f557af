//! Training Infrastructure
//!
//! Parameter store, pretraining and actor-critic loops, evaluation,
//! checkpointing and run reports.

pub mod checkpointing;
pub mod evaluation;
pub mod params;
pub mod pretrain;
pub mod report;
pub mod trainer;

pub use checkpointing::{episode_name, timestamped_name, Checkpointer};
pub use evaluation::{evaluate_forecasts, run_backtest, BacktestResult, ForecastMetrics};
pub use params::{adam_optimizer, ParameterStore};
pub use pretrain::{forecast_loss, pretrain, EpochLoss, PretrainReport};
pub use report::RunReport;
pub use trainer::{
    collect_rollout, summarize_results, ActorCriticTrainer, EpisodeResult, TrainerPhase,
    TrainingSummary,
};
