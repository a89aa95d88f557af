//! Windowed Dataset
//!
//! Scales bar features into [0, 1] and cuts them into fixed-length
//! windows paired with a future close-price label.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::loader::PriceBar;
use crate::error::{FxError, Result};

/// Feature columns of every window row
pub const FEATURE_NAMES: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Number of features per time step
pub const NUM_FEATURES: usize = FEATURE_NAMES.len();

/// Column holding the closing price
pub const CLOSE_INDEX: usize = 3;

/// A `seq_len × n_features` matrix of scaled features, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    values: Vec<f32>,
    seq_len: usize,
    n_features: usize,
}

impl Window {
    /// Create a window, validating the buffer length
    pub fn new(values: Vec<f32>, seq_len: usize, n_features: usize) -> Result<Self> {
        if values.len() != seq_len * n_features {
            return Err(FxError::InvalidData(format!(
                "window buffer has {} values, expected {}x{}",
                values.len(),
                seq_len,
                n_features
            )));
        }

        Ok(Self {
            values,
            seq_len,
            n_features,
        })
    }

    /// Zero-filled window, used as the terminal observation
    pub fn zeros(seq_len: usize, n_features: usize) -> Self {
        Self {
            values: vec![0.0; seq_len * n_features],
            seq_len,
            n_features,
        }
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Feature value at time step `t`
    pub fn value(&self, t: usize, feature: usize) -> f32 {
        self.values[t * self.n_features + feature]
    }

    /// Feature value at the most recent time step
    pub fn last_value(&self, feature: usize) -> f32 {
        self.value(self.seq_len - 1, feature)
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// Ordered windows with their scaled future-close labels
#[derive(Debug, Clone)]
pub struct WindowedSeries {
    windows: Vec<Window>,
    targets: Vec<f32>,
    close_index: usize,
    seq_len: usize,
    n_features: usize,
}

impl WindowedSeries {
    /// Create a series; every window must share the given shape
    pub fn new(
        windows: Vec<Window>,
        targets: Vec<f32>,
        close_index: usize,
        seq_len: usize,
        n_features: usize,
    ) -> Result<Self> {
        if windows.len() != targets.len() {
            return Err(FxError::InvalidData(format!(
                "{} windows but {} targets",
                windows.len(),
                targets.len()
            )));
        }
        if seq_len == 0 || close_index >= n_features {
            return Err(FxError::InvalidData(format!(
                "close index {} out of range for {} features (seq_len {})",
                close_index, n_features, seq_len
            )));
        }
        if let Some(bad) = windows
            .iter()
            .position(|w| w.seq_len() != seq_len || w.n_features() != n_features)
        {
            return Err(FxError::InvalidData(format!("window {} has a different shape", bad)));
        }

        Ok(Self {
            windows,
            targets,
            close_index,
            seq_len,
            n_features,
        })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn window(&self, idx: usize) -> &Window {
        &self.windows[idx]
    }

    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    pub fn target(&self, idx: usize) -> f32 {
        self.targets[idx]
    }

    pub fn close_index(&self) -> usize {
        self.close_index
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Scaled close at the last step of window `idx`
    pub fn last_close(&self, idx: usize) -> f32 {
        self.windows[idx].last_value(self.close_index)
    }
}

/// Affine map between raw prices and the scaled close feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScaler {
    pub min: f32,
    pub max: f32,
}

impl PriceScaler {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Scaled values are already raw prices
    pub fn identity() -> Self {
        Self { min: 0.0, max: 1.0 }
    }

    fn range(&self) -> f32 {
        self.max - self.min
    }

    pub fn to_raw(&self, scaled: f32) -> f32 {
        self.min + scaled * self.range()
    }

    pub fn to_scaled(&self, raw: f32) -> f32 {
        let range = self.range();
        if range.abs() < f32::EPSILON {
            return 0.0;
        }
        (raw - self.min) / range
    }
}

/// Per-column min-max scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    mins: Vec<f32>,
    maxs: Vec<f32>,
}

impl MinMaxScaler {
    /// Fit on feature rows; fails on an empty slice
    pub fn fit(rows: &[[f32; NUM_FEATURES]]) -> Result<Self> {
        if rows.is_empty() {
            return Err(FxError::InvalidData("cannot fit scaler on zero rows".to_string()));
        }

        let mut mins = vec![f32::INFINITY; NUM_FEATURES];
        let mut maxs = vec![f32::NEG_INFINITY; NUM_FEATURES];
        for row in rows {
            for (col, &v) in row.iter().enumerate() {
                mins[col] = mins[col].min(v);
                maxs[col] = maxs[col].max(v);
            }
        }

        Ok(Self { mins, maxs })
    }

    pub fn column(&self, col: usize) -> PriceScaler {
        PriceScaler::new(self.mins[col], self.maxs[col])
    }

    /// Scale a row; constant columns map to 0
    pub fn transform(&self, row: &[f32; NUM_FEATURES]) -> [f32; NUM_FEATURES] {
        let mut out = [0.0; NUM_FEATURES];
        for (col, &v) in row.iter().enumerate() {
            out[col] = self.column(col).to_scaled(v);
        }
        out
    }
}

/// How bars are cut into windows and split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    /// Time steps per window
    pub seq_len: usize,
    /// Bars between the last window row and the label
    pub horizon: usize,
    /// Fraction of windows used for training
    pub train_fraction: f64,
    /// Fraction of windows used for validation; the rest is test
    pub val_fraction: f64,
}

impl Default for SplitSpec {
    fn default() -> Self {
        Self {
            seq_len: 30,
            horizon: 1,
            train_fraction: 0.7,
            val_fraction: 0.15,
        }
    }
}

/// Chronological train/validation/test splits sharing one scaler
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    pub train: Arc<WindowedSeries>,
    pub val: Arc<WindowedSeries>,
    pub test: Arc<WindowedSeries>,
    pub scaler: MinMaxScaler,
}

impl DatasetSplits {
    /// Scaler of the close column, for converting back to price units
    pub fn price_scaler(&self) -> PriceScaler {
        self.scaler.column(CLOSE_INDEX)
    }
}

/// Scale bars and cut them into chronological window splits
///
/// The scaler is fit on the rows preceding the validation period only.
pub fn build_splits(bars: &[PriceBar], spec: &SplitSpec) -> Result<DatasetSplits> {
    if spec.seq_len == 0 || spec.horizon == 0 {
        return Err(FxError::InvalidData("seq_len and horizon must be positive".to_string()));
    }
    if spec.train_fraction <= 0.0 || spec.val_fraction < 0.0 || spec.train_fraction + spec.val_fraction > 1.0 {
        return Err(FxError::InvalidData(format!(
            "invalid split fractions train={} val={}",
            spec.train_fraction, spec.val_fraction
        )));
    }

    let span = spec.seq_len + spec.horizon;
    if bars.len() < span {
        return Err(FxError::InvalidData(format!(
            "need at least {} bars, got {}",
            span,
            bars.len()
        )));
    }

    let rows: Vec<[f32; NUM_FEATURES]> = bars.iter().map(PriceBar::features).collect();
    let num_windows = rows.len() - span + 1;
    let n_train = ((num_windows as f64) * spec.train_fraction).floor() as usize;
    let n_val = ((num_windows as f64) * spec.val_fraction).floor() as usize;

    // Rows touched by training windows and their labels
    let train_rows = (n_train + span - 1).min(rows.len()).max(1);
    let scaler = MinMaxScaler::fit(&rows[..train_rows])?;
    let scaled: Vec<[f32; NUM_FEATURES]> = rows.iter().map(|r| scaler.transform(r)).collect();

    let mut windows = Vec::with_capacity(num_windows);
    let mut targets = Vec::with_capacity(num_windows);
    for start in 0..num_windows {
        let values: Vec<f32> = scaled[start..start + spec.seq_len]
            .iter()
            .flat_map(|r| r.iter().copied())
            .collect();
        windows.push(Window::new(values, spec.seq_len, NUM_FEATURES)?);
        targets.push(scaled[start + spec.seq_len - 1 + spec.horizon][CLOSE_INDEX]);
    }

    let split = |from: usize, to: usize| -> Result<Arc<WindowedSeries>> {
        Ok(Arc::new(WindowedSeries::new(
            windows[from..to].to_vec(),
            targets[from..to].to_vec(),
            CLOSE_INDEX,
            spec.seq_len,
            NUM_FEATURES,
        )?))
    };

    let splits = DatasetSplits {
        train: split(0, n_train)?,
        val: split(n_train, n_train + n_val)?,
        test: split(n_train + n_val, num_windows)?,
        scaler,
    };

    info!(
        "Built {} windows (seq_len={}, horizon={}): train={}, val={}, test={}",
        num_windows,
        spec.seq_len,
        spec.horizon,
        splits.train.len(),
        splits.val.len(),
        splits.test.len()
    );

    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising_bars(n: usize) -> Vec<PriceBar> {
        (0..n)
            .map(|i| {
                let p = 1.0 + i as f64 * 0.01;
                PriceBar {
                    timestamp: i as i64,
                    open: p,
                    high: p + 0.005,
                    low: p - 0.005,
                    close: p,
                    volume: None,
                }
            })
            .collect()
    }

    #[test]
    fn test_window_shape_validation() {
        assert!(Window::new(vec![0.0; 6], 2, 3).is_ok());
        assert!(Window::new(vec![0.0; 5], 2, 3).is_err());

        let w = Window::new(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 2, 3).unwrap();
        assert_eq!(w.last_value(0), 0.4);
        assert_eq!(w.value(0, 2), 0.3);
    }

    #[test]
    fn test_price_scaler_inverse() {
        let s = PriceScaler::new(1.10, 1.30);
        let raw = s.to_raw(s.to_scaled(1.25));
        assert!((raw - 1.25).abs() < 1e-6);
        assert_eq!(PriceScaler::new(2.0, 2.0).to_scaled(2.0), 0.0);
    }

    #[test]
    fn test_build_splits_counts_and_labels() {
        let bars = rising_bars(40);
        let spec = SplitSpec {
            seq_len: 5,
            horizon: 2,
            train_fraction: 0.5,
            val_fraction: 0.25,
        };
        let splits = build_splits(&bars, &spec).unwrap();

        // 40 - (5 + 2) + 1 windows
        let total = splits.train.len() + splits.val.len() + splits.test.len();
        assert_eq!(total, 34);
        assert_eq!(splits.train.len(), 17);
        assert_eq!(splits.val.len(), 8);

        let scaler = splits.price_scaler();
        let first_label = scaler.to_raw(splits.train.target(0));
        // Label of window 0 is the close at row 4 + 2
        assert!((first_label - 1.06).abs() < 1e-5);
        let last_close = scaler.to_raw(splits.train.last_close(0));
        assert!((last_close - 1.04).abs() < 1e-5);
    }

    #[test]
    fn test_train_windows_are_within_unit_range() {
        let splits = build_splits(&rising_bars(60), &SplitSpec { seq_len: 4, ..Default::default() }).unwrap();
        for w in splits.train.windows() {
            assert!(w.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_too_few_bars() {
        let err = build_splits(&rising_bars(3), &SplitSpec::default()).unwrap_err();
        assert!(matches!(err, FxError::InvalidData(_)));
    }
}
