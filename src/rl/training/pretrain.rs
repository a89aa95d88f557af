//! Forecast Pretraining
//!
//! Supervised regression of the forecast head onto the scaled future close,
//! so the shared encoder starts from a price-predictive representation.

use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, TensorData};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::params::ParameterStore;
use crate::data::{Window, WindowedSeries};
use crate::error::TrainingError;
use crate::rl::config::PretrainConfig;
use crate::rl::networks::{windows_to_tensor, PolicyValueModel};

/// Losses of one pretraining epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochLoss {
    pub epoch: usize,
    pub train_loss: f32,
    /// `None` when the validation split is empty
    pub val_loss: Option<f32>,
}

/// Per-epoch history of a pretraining run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PretrainReport {
    pub epochs: Vec<EpochLoss>,
    pub batches: usize,
}

impl PretrainReport {
    pub fn final_val_loss(&self) -> Option<f32> {
        self.epochs.last().and_then(|e| e.val_loss)
    }
}

/// Mean squared forecast error over a series, in scaled units
pub fn forecast_loss<B: Backend, M: PolicyValueModel<B>>(
    model: &M,
    series: &WindowedSeries,
    batch_size: usize,
    device: &B::Device,
) -> Result<Option<f32>, TrainingError> {
    if series.is_empty() {
        return Ok(None);
    }

    let mut sum = 0.0f64;
    let batch_size = batch_size.max(1);
    let indices: Vec<usize> = (0..series.len()).collect();

    for chunk in indices.chunks(batch_size) {
        let loss = batch_mse(model, series, chunk, device)?;
        sum += loss.into_scalar().elem::<f32>() as f64 * chunk.len() as f64;
    }

    Ok(Some((sum / series.len() as f64) as f32))
}

fn batch_mse<B: Backend, M: PolicyValueModel<B>>(
    model: &M,
    series: &WindowedSeries,
    indices: &[usize],
    device: &B::Device,
) -> Result<Tensor<B, 1>, TrainingError> {
    let n = indices.len();
    let windows: Vec<Window> = indices.iter().map(|&i| series.window(i).clone()).collect();
    let targets: Vec<f32> = indices.iter().map(|&i| series.target(i)).collect();

    let forecast = model.forward(windows_to_tensor::<B>(&windows, device)?).forecast.reshape([n]);
    let targets = Tensor::<B, 1>::from_data(TensorData::new(targets, [n]), device);

    Ok((forecast - targets).powf_scalar(2.0).mean())
}

/// Fit the forecast head with shuffled minibatch MSE
///
/// Non-convergence is not an error; callers inspect the reported losses.
/// A non-finite minibatch loss aborts before it reaches the parameters.
pub fn pretrain<B, M, O>(
    store: &mut ParameterStore<B, M, O>,
    train: &WindowedSeries,
    val: &WindowedSeries,
    config: &PretrainConfig,
) -> Result<PretrainReport, TrainingError>
where
    B: AutodiffBackend,
    M: PolicyValueModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let mut report = PretrainReport::default();

    if train.is_empty() {
        warn!("No training windows, skipping forecast pretraining");
        return Ok(report);
    }

    info!(
        "Pretraining forecast head for {} epochs: train={}, val={}, batch_size={}",
        config.epochs,
        train.len(),
        val.len(),
        config.batch_size
    );

    let device = store.device().clone();
    let batch_size = config.batch_size.max(1);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut indices: Vec<usize> = (0..train.len()).collect();

    for epoch in 0..config.epochs {
        indices.shuffle(&mut rng);

        let mut loss_sum = 0.0f64;
        for chunk in indices.chunks(batch_size) {
            let loss = batch_mse(store.model(), train, chunk, &device)?;
            let value = loss.clone().into_scalar().elem::<f32>();

            if !value.is_finite() {
                return Err(TrainingError::TrainingDiverged {
                    phase: "pretrain",
                    step: epoch,
                    loss: value,
                });
            }

            store.apply_gradients(loss, config.lr);
            loss_sum += value as f64 * chunk.len() as f64;
            report.batches += 1;
        }

        let train_loss = (loss_sum / train.len() as f64) as f32;
        let val_loss = forecast_loss(store.model(), val, batch_size, &device)?;

        match val_loss {
            Some(v) => info!(
                "Epoch {}/{}: train_loss={:.6}, val_loss={:.6}",
                epoch + 1,
                config.epochs,
                train_loss,
                v
            ),
            None => info!("Epoch {}/{}: train_loss={:.6}", epoch + 1, config.epochs, train_loss),
        }

        report.epochs.push(EpochLoss {
            epoch,
            train_loss,
            val_loss,
        });
    }

    Ok(report)
}
