//! Training Pipeline
//!
//! Data -> forecast pretraining -> actor-critic -> evaluation -> checkpoint.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn::prelude::*;
use burn_ndarray::NdArray;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::data::{build_splits, generate_random_walk, load_bars, DatasetSplits, PriceBar, NUM_FEATURES};
use crate::error::Result;
use crate::rl::training::{
    adam_optimizer, episode_name, evaluate_forecasts, pretrain, run_backtest, summarize_results,
    ActorCriticTrainer, BacktestResult, Checkpointer, ForecastMetrics, ParameterStore, RunReport,
};
use crate::rl::{CategoricalSampler, PolicyValueNet, PolicyValueNetConfig, TradingEnvironment};

/// Backend for inference and evaluation
pub type InferenceBackend = NdArray<f32>;

/// Backend for training
pub type TrainBackend = Autodiff<InferenceBackend>;

/// Load bars from the configured CSV, or generate a synthetic walk
pub fn load_data(config: &AppConfig) -> Result<Vec<PriceBar>> {
    let data = &config.data;
    match &data.csv_path {
        Some(path) => {
            info!("Loading bars from {:?}", path);
            load_bars(path)
        }
        None => {
            info!(
                "Generating {} synthetic bars (start={}, volatility={}, seed={})",
                data.synthetic_bars, data.start_price, data.volatility, data.seed
            );
            Ok(generate_random_walk(data.synthetic_bars, data.start_price, data.volatility, data.seed))
        }
    }
}

pub fn prepare_splits(config: &AppConfig) -> Result<DatasetSplits> {
    let bars = load_data(config)?;
    build_splits(&bars, &config.data.split_spec())
}

fn network_config(config: &AppConfig) -> PolicyValueNetConfig {
    PolicyValueNetConfig::new(config.data.seq_len, NUM_FEATURES)
        .with_hidden_dim(config.model.hidden_dim)
        .with_latent_dim(config.model.latent_dim)
}

/// Forecast and backtest metrics on the test split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub forecast: ForecastMetrics,
    pub backtest: BacktestResult,
}

fn evaluate(
    model: &PolicyValueNet<InferenceBackend>,
    splits: &DatasetSplits,
    config: &AppConfig,
) -> Result<Evaluation> {
    let device: <InferenceBackend as Backend>::Device = Default::default();
    let scaler = splits.price_scaler();

    let forecast = evaluate_forecasts(model, &splits.test, &scaler, config.pretrain.batch_size, &device)?;
    info!(
        "Test forecast: mse={:.8}, mae={:.6}, rmse={:.6}, directional_accuracy={:.1}%",
        forecast.mse,
        forecast.mae,
        forecast.rmse,
        forecast.directional_accuracy * 100.0
    );

    let mut env = TradingEnvironment::new(splits.test.clone(), scaler, config.env.clone());
    let backtest = run_backtest(model, &mut env, &device)?;

    Ok(Evaluation { forecast, backtest })
}

/// Run the full training pipeline and write the checkpoint and report
///
/// Raising `stop` ends actor-critic training after the current episode;
/// evaluation and checkpointing still run.
pub fn run_training(config: &AppConfig, stop: Arc<AtomicBool>) -> Result<RunReport> {
    config.validate()?;

    let splits = prepare_splits(config)?;
    let device: <TrainBackend as Backend>::Device = Default::default();

    let model = network_config(config).init::<TrainBackend>(&device);
    let optimizer = adam_optimizer::<TrainBackend, PolicyValueNet<TrainBackend>>(config.a2c.max_grad_norm);
    let mut store = ParameterStore::new(model, optimizer, device);

    let pretrain_report = pretrain(&mut store, &splits.train, &splits.val, &config.pretrain)?;

    let mut env = TradingEnvironment::new(splits.train.clone(), splits.price_scaler(), config.env.clone());
    let mut trainer = ActorCriticTrainer::new(config.a2c.clone(), CategoricalSampler::seeded(config.a2c.seed))
        .with_stop_flag(stop);
    let results = trainer.train_actor_critic(&mut store, &mut env, config.a2c.episodes)?;

    let interrupted = results.len() < config.a2c.episodes;
    if interrupted {
        warn!("Training interrupted after {}/{} episodes", results.len(), config.a2c.episodes);
    }

    let summary = summarize_results(&results);
    info!(
        "Training summary: episodes={}, avg_reward={:.5}, final_avg_reward={:.5}, skipped={}",
        summary.num_episodes, summary.avg_reward, summary.final_avg_reward, summary.skipped_updates
    );

    let model = store.into_model().valid();
    let evaluation = evaluate(&model, &splits, config)?;

    let checkpointer = Checkpointer::new(&config.output.checkpoint_dir, config.output.max_checkpoints)?;
    let name = episode_name(&config.output.model_name, results.len());
    checkpointer.save::<InferenceBackend, _>(&model, &name)?;

    let report = RunReport {
        created_at: Utc::now(),
        checkpoint: Some(name),
        pretrain: pretrain_report,
        training: summary,
        forecast: evaluation.forecast,
        backtest: evaluation.backtest,
        interrupted,
    };
    report.save_json(config.report_path())?;

    Ok(report)
}

/// Evaluate a saved checkpoint on the test split
pub fn run_evaluation(config: &AppConfig, model_name: &str) -> Result<Evaluation> {
    config.validate()?;

    let splits = prepare_splits(config)?;
    let device: <InferenceBackend as Backend>::Device = Default::default();

    let checkpointer = Checkpointer::new(&config.output.checkpoint_dir, config.output.max_checkpoints)?;
    let model = network_config(config).init::<InferenceBackend>(&device);
    let model = checkpointer.load::<InferenceBackend, _>(model, model_name, &device)?;

    evaluate(&model, &splits, config)
}

/// Name of the newest checkpoint in the configured directory
pub fn latest_model(config: &AppConfig) -> Result<Option<String>> {
    let checkpointer = Checkpointer::new(&config.output.checkpoint_dir, config.output.max_checkpoints)?;
    Ok(checkpointer.latest_checkpoint())
}
