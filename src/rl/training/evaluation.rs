//! Evaluation
//!
//! Forecast accuracy on a held-out split and a greedy-policy backtest.

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::trainer::collect_rollout;
use crate::data::{PriceScaler, WindowedSeries};
use crate::error::TrainingError;
use crate::rl::core::{GreedySampler, TradeAction, NUM_ACTIONS};
use crate::rl::environment::TradingEnvironment;
use crate::rl::networks::{tensor_to_vec, windows_to_tensor, PolicyValueModel};

/// Forecast error in price units
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
    /// Share of windows where the predicted move has the realized sign
    pub directional_accuracy: f64,
    pub samples: usize,
}

fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Score the forecast head against the labels of `series`
///
/// Forecasts, labels and the last close are mapped back to raw prices with
/// `scaler` before any error is taken.
pub fn evaluate_forecasts<B: Backend, M: PolicyValueModel<B>>(
    model: &M,
    series: &WindowedSeries,
    scaler: &PriceScaler,
    batch_size: usize,
    device: &B::Device,
) -> Result<ForecastMetrics, TrainingError> {
    if series.is_empty() {
        return Ok(ForecastMetrics::default());
    }

    let mut sq_sum = 0.0f64;
    let mut abs_sum = 0.0f64;
    let mut hits = 0usize;

    let windows = series.windows();
    let mut offset = 0;
    for chunk in windows.chunks(batch_size.max(1)) {
        let forecast = tensor_to_vec(model.forward(windows_to_tensor::<B>(chunk, device)?).forecast)?;

        for (i, predicted) in forecast.into_iter().enumerate() {
            let idx = offset + i;
            let predicted = scaler.to_raw(predicted);
            let actual = scaler.to_raw(series.target(idx));
            let last = scaler.to_raw(series.last_close(idx));

            let err = (predicted - actual) as f64;
            sq_sum += err * err;
            abs_sum += err.abs();

            if sign(predicted - last) == sign(actual - last) {
                hits += 1;
            }
        }
        offset += chunk.len();
    }

    let n = series.len() as f64;
    let mse = sq_sum / n;

    Ok(ForecastMetrics {
        mse,
        mae: abs_sum / n,
        rmse: mse.sqrt(),
        directional_accuracy: hits as f64 / n,
        samples: series.len(),
    })
}

/// Greedy-policy backtest over one episode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestResult {
    pub total_reward: f32,
    pub steps: usize,
    pub num_trades: usize,
    /// Times each action was chosen, indexed sell/hold/buy
    pub action_counts: [usize; NUM_ACTIONS],
    pub final_position: i8,
    pub episode_pnl: f64,
}

/// Replay `env` once, always taking the most probable action
pub fn run_backtest<B: Backend, M: PolicyValueModel<B>>(
    model: &M,
    env: &mut TradingEnvironment,
    device: &B::Device,
) -> Result<BacktestResult, TrainingError> {
    info!("Starting backtest over {} windows", env.n_steps());

    let rollout = collect_rollout::<B, M, _, _>(model, env, &mut GreedySampler, device)?;

    let mut action_counts = [0usize; NUM_ACTIONS];
    for &action in &rollout.actions {
        action_counts[action] += 1;
    }

    let result = BacktestResult {
        total_reward: rollout.total_reward(),
        steps: rollout.len(),
        num_trades: env.num_trades(),
        action_counts,
        final_position: env.position(),
        episode_pnl: env.episode_pnl(),
    };

    info!(
        "Backtest complete: reward={:.5}, steps={}, trades={}, {}={} {}={} {}={}",
        result.total_reward,
        result.steps,
        result.num_trades,
        TradeAction::Sell.name(),
        action_counts[TradeAction::Sell.to_index()],
        TradeAction::Hold.name(),
        action_counts[TradeAction::Hold.to_index()],
        TradeAction::Buy.name(),
        action_counts[TradeAction::Buy.to_index()],
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Window;
    use crate::rl::environment::TradingEnvConfig;
    use crate::rl::networks::PolicyValueNetConfig;
    use burn_ndarray::NdArray;
    use std::sync::Arc;

    type TestBackend = NdArray<f32>;

    fn series(n: usize) -> WindowedSeries {
        let windows = (0..n)
            .map(|i| Window::new(vec![0.5, i as f32 * 0.1], 2, 1).unwrap())
            .collect();
        let targets = (0..n).map(|i| i as f32 * 0.1 + 0.05).collect();
        WindowedSeries::new(windows, targets, 0, 2, 1).unwrap()
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(0.3), 1);
        assert_eq!(sign(-0.3), -1);
        assert_eq!(sign(0.0), 0);
    }

    #[test]
    fn test_forecast_metrics_are_consistent() {
        let device = Default::default();
        let model = PolicyValueNetConfig::new(2, 1).init::<TestBackend>(&device);
        let series = series(10);

        let metrics = evaluate_forecasts(&model, &series, &PriceScaler::new(1.0, 2.0), 3, &device).unwrap();

        assert_eq!(metrics.samples, 10);
        assert!((metrics.rmse - metrics.mse.sqrt()).abs() < 1e-9);
        assert!(metrics.mae <= metrics.rmse + 1e-9);
        assert!((0.0..=1.0).contains(&metrics.directional_accuracy));
    }

    #[test]
    fn test_forecast_metrics_empty_series() {
        let device = Default::default();
        let model = PolicyValueNetConfig::new(2, 1).init::<TestBackend>(&device);
        let empty = WindowedSeries::new(vec![], vec![], 0, 2, 1).unwrap();

        let metrics = evaluate_forecasts(&model, &empty, &PriceScaler::identity(), 8, &device).unwrap();
        assert_eq!(metrics.samples, 0);
    }

    #[test]
    fn test_backtest_counts_every_step() {
        let device = Default::default();
        let model = PolicyValueNetConfig::new(2, 1).init::<TestBackend>(&device);
        let mut env = TradingEnvironment::new(
            Arc::new(series(6)),
            PriceScaler::identity(),
            TradingEnvConfig::default(),
        );

        let result = run_backtest(&model, &mut env, &device).unwrap();

        assert_eq!(result.steps, 5);
        assert_eq!(result.action_counts.iter().sum::<usize>(), 5);
        assert!(result.num_trades <= 5);
    }
}
