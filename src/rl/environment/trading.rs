//! Trading Environment for RL Training
//!
//! Replays a fixed sequence of windows with a gym-like reset/step interface.
//! Each step holds the chosen position against the realized move from the
//! window's last close to its label, minus a commission on position change.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{PriceScaler, Window, WindowedSeries};
use crate::error::EnvError;
use crate::rl::core::TradeAction;

use super::Environment;

/// Trading environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingEnvConfig {
    /// Cost per unit of position change, in price units
    pub commission_rate: f32,
}

impl Default for TradingEnvConfig {
    fn default() -> Self {
        Self {
            commission_rate: 0.0001,
        }
    }
}

/// Lifecycle of the current episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeStatus {
    /// No reset since construction
    NotStarted,
    /// Accepting steps
    Running,
    /// Terminal; only reset is allowed
    Done,
}

/// Result of taking a step in the environment
#[derive(Debug, Clone)]
pub struct StepResult {
    /// New observation after action
    pub observation: Window,
    /// Reward signal
    pub reward: f32,
    /// Whether episode is done
    pub done: bool,
    /// Additional info
    pub info: StepInfo,
}

/// Additional step information
#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    /// Close at the last step of the acted-on window (price units)
    pub prev_price: f32,
    /// Realized label price (price units)
    pub true_price: f32,
    /// Commission charged this step
    pub cost: f32,
    /// Position held after the step
    pub position: i8,
}

/// Trading environment for RL training
pub struct TradingEnvironment {
    config: TradingEnvConfig,
    series: Arc<WindowedSeries>,
    scaler: PriceScaler,
    current_idx: usize,
    position: i8,
    status: EpisodeStatus,
    episode_pnl: f64,
    num_trades: usize,
}

impl TradingEnvironment {
    /// Create a new trading environment over a windowed series
    ///
    /// `scaler` maps the close feature and labels back to price units, so
    /// rewards are expressed in the pair's quote currency.
    pub fn new(series: Arc<WindowedSeries>, scaler: PriceScaler, config: TradingEnvConfig) -> Self {
        Self {
            config,
            series,
            scaler,
            current_idx: 0,
            position: 0,
            status: EpisodeStatus::NotStarted,
            episode_pnl: 0.0,
            num_trades: 0,
        }
    }

    /// Reset the environment for a new episode
    ///
    /// A series with fewer than two windows cannot produce a step, so the
    /// episode is terminal straight away.
    pub fn reset(&mut self) -> Window {
        self.current_idx = 0;
        self.position = 0;
        self.episode_pnl = 0.0;
        self.num_trades = 0;

        self.status = if self.n_steps() < 2 {
            EpisodeStatus::Done
        } else {
            EpisodeStatus::Running
        };

        if self.series.is_empty() {
            self.zero_window()
        } else {
            self.series.window(0).clone()
        }
    }

    /// Take a step in the environment
    pub fn step(&mut self, action: usize) -> Result<StepResult, EnvError> {
        let action = TradeAction::try_from(action)?;

        match self.status {
            EpisodeStatus::NotStarted => return Err(EnvError::EpisodeNotStarted),
            EpisodeStatus::Done => return Err(EnvError::StaleEpisode),
            EpisodeStatus::Running => {}
        }

        let target = action.target_position();
        let true_price = self.scaler.to_raw(self.series.target(self.current_idx));
        let prev_price = self.scaler.to_raw(self.series.last_close(self.current_idx));

        let mut pnl = (true_price - prev_price) * target as f32;
        let cost = self.transaction_cost(action);
        pnl -= cost;

        if target != self.position {
            self.num_trades += 1;
        }
        self.position = target;
        self.episode_pnl += pnl as f64;

        self.current_idx += 1;
        let done = self.current_idx >= self.n_steps() - 1;
        if done {
            self.status = EpisodeStatus::Done;
        }

        let observation = if done {
            self.zero_window()
        } else {
            self.series.window(self.current_idx).clone()
        };

        Ok(StepResult {
            observation,
            reward: pnl,
            done,
            info: StepInfo {
                prev_price,
                true_price,
                cost,
                position: self.position,
            },
        })
    }

    /// Commission for moving from the current position to the action's target
    pub fn transaction_cost(&self, action: TradeAction) -> f32 {
        (action.target_position() - self.position).abs() as f32 * self.config.commission_rate
    }

    /// Log the current state
    pub fn render(&self) {
        debug!(
            idx = self.current_idx,
            position = self.position,
            pnl = self.episode_pnl,
            trades = self.num_trades,
            "env state"
        );
    }

    fn zero_window(&self) -> Window {
        Window::zeros(self.series.seq_len(), self.series.n_features())
    }

    /// Number of windows replayed per episode
    pub fn n_steps(&self) -> usize {
        self.series.len()
    }

    pub fn current_idx(&self) -> usize {
        self.current_idx
    }

    pub fn position(&self) -> i8 {
        self.position
    }

    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status == EpisodeStatus::Done
    }

    /// Get episode PnL
    pub fn episode_pnl(&self) -> f64 {
        self.episode_pnl
    }

    /// Number of steps that changed the position
    pub fn num_trades(&self) -> usize {
        self.num_trades
    }

    /// Get observation shape (seq_len, n_features)
    pub fn observation_shape(&self) -> (usize, usize) {
        (self.series.seq_len(), self.series.n_features())
    }

    /// Get action dimension
    pub fn action_dim(&self) -> usize {
        TradeAction::all().len()
    }

    #[cfg(test)]
    pub(crate) fn force_position(&mut self, position: i8) {
        self.position = position;
    }
}

impl Environment for TradingEnvironment {
    fn reset(&mut self) -> Window {
        TradingEnvironment::reset(self)
    }

    fn step(&mut self, action: usize) -> Result<StepResult, EnvError> {
        TradingEnvironment::step(self, action)
    }

    fn n_steps(&self) -> usize {
        TradingEnvironment::n_steps(self)
    }

    fn is_done(&self) -> bool {
        TradingEnvironment::is_done(self)
    }

    fn render(&self) {
        TradingEnvironment::render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Series of single-feature windows where the close equals the window
    /// index and every label is one unit above the last close.
    fn rising_series(n: usize, seq_len: usize) -> Arc<WindowedSeries> {
        let windows = (0..n)
            .map(|i| Window::new(vec![i as f32; seq_len], seq_len, 1).unwrap())
            .collect();
        let targets = (0..n).map(|i| i as f32 + 1.0).collect();
        Arc::new(WindowedSeries::new(windows, targets, 0, seq_len, 1).unwrap())
    }

    fn env(n: usize, commission: f32) -> TradingEnvironment {
        TradingEnvironment::new(
            rising_series(n, 2),
            PriceScaler::identity(),
            TradingEnvConfig {
                commission_rate: commission,
            },
        )
    }

    #[test]
    fn test_env_reset() {
        let mut env = env(5, 0.0);
        let obs = env.reset();

        assert_eq!(obs.as_slice(), &[0.0, 0.0]);
        assert_eq!(env.position(), 0);
        assert_eq!(env.current_idx(), 0);
        assert_eq!(env.status(), EpisodeStatus::Running);
    }

    #[test]
    fn test_transaction_cost_all_combinations() {
        let commission = 0.25;
        let mut env = env(5, commission);
        env.reset();

        for position in [-1i8, 0, 1] {
            for action in TradeAction::all() {
                env.force_position(position);
                let expected = (action.to_index() as i32 - 1 - position as i32).abs() as f32 * commission;
                assert_eq!(env.transaction_cost(*action), expected);
            }
        }
    }

    #[test]
    fn test_step_reward_includes_cost() {
        let mut env = env(5, 0.1);
        env.reset();

        // Long from flat: +1 move, one unit of commission
        let r = env.step(2).unwrap();
        assert!((r.reward - 0.9).abs() < 1e-6);
        assert_eq!(r.info.position, 1);

        // Flip to short: -1 move, two units of commission
        let r = env.step(0).unwrap();
        assert!((r.reward - (-1.2)).abs() < 1e-6);

        // Flat from short: no exposure, one unit of commission
        let r = env.step(1).unwrap();
        assert!((r.reward - (-0.1)).abs() < 1e-6);
        assert_eq!(env.num_trades(), 3);
    }

    #[test]
    fn test_done_on_last_step_only() {
        let n = 6;
        let mut env = env(n, 0.0);
        env.reset();

        for i in 0..n - 1 {
            let r = env.step(1).unwrap();
            assert_eq!(r.done, i == n - 2, "step {}", i);
        }
    }

    #[test]
    fn test_terminal_observation_is_zero_window() {
        let mut env = env(2, 0.0);
        env.reset();
        let r = env.step(2).unwrap();

        assert!(r.done);
        assert_eq!(r.observation, Window::zeros(2, 1));
    }

    #[test]
    fn test_step_after_done_is_stale() {
        let mut env = env(3, 0.0);
        env.reset();
        env.step(1).unwrap();
        env.step(1).unwrap();

        assert_eq!(env.step(1).unwrap_err(), EnvError::StaleEpisode);
    }

    #[test]
    fn test_invalid_action() {
        let mut env = env(3, 0.0);
        env.reset();

        assert_eq!(env.step(5).unwrap_err(), EnvError::InvalidAction(5));
        // Rejected input does not advance the episode
        assert_eq!(env.current_idx(), 0);
    }

    #[test]
    fn test_step_before_reset() {
        let mut env = env(3, 0.0);
        assert_eq!(env.step(1).unwrap_err(), EnvError::EpisodeNotStarted);
    }

    #[test]
    fn test_single_window_is_degenerate() {
        let mut env = env(1, 0.0);
        env.reset();

        assert!(env.is_done());
        assert_eq!(env.step(1).unwrap_err(), EnvError::StaleEpisode);
    }

    #[test]
    fn test_reset_is_repeatable() {
        let mut env = env(4, 0.0);
        let first = env.reset();

        for _ in 0..3 {
            while !env.is_done() {
                env.step(2).unwrap();
            }
            assert_eq!(env.reset(), first);
            assert_eq!(env.position(), 0);
            assert_eq!(env.current_idx(), 0);
        }
    }
}
