//! Price Data
//!
//! Historical bars, scaling and fixed-length sliding windows consumed by
//! the trading environment and the policy-value network.

mod loader;
mod window;

pub use loader::{generate_random_walk, load_bars, save_bars, PriceBar};
pub use window::{
    build_splits, DatasetSplits, MinMaxScaler, PriceScaler, SplitSpec, Window, WindowedSeries,
    CLOSE_INDEX, FEATURE_NAMES, NUM_FEATURES,
};
