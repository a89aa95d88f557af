//! Bar loading
//!
//! CSV import/export of OHLCV bars and a seeded random-walk generator for
//! offline experiments.

use std::fs::File;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FxError, Result};

/// One OHLCV bar of the currency pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar open time (unix seconds)
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Tick volume; many FX feeds leave this empty or omit the column
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub volume: Option<f64>,
}

impl PriceBar {
    /// Feature row in `FEATURE_NAMES` order; missing volume reads as zero
    pub fn features(&self) -> [f32; 5] {
        [
            self.open as f32,
            self.high as f32,
            self.low as f32,
            self.close as f32,
            self.volume.unwrap_or(0.0) as f32,
        ]
    }
}

/// Load bars from a CSV file with a `timestamp,open,high,low,close[,volume]` header
pub fn load_bars<P: AsRef<Path>>(path: P) -> Result<Vec<PriceBar>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut bars = Vec::new();
    for record in reader.deserialize() {
        let bar: PriceBar = record?;
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(FxError::InvalidData(format!(
                "non-positive close {} at timestamp {}",
                bar.close, bar.timestamp
            )));
        }
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.timestamp);
    debug!("Loaded {} bars from {:?}", bars.len(), path);

    Ok(bars)
}

/// Write bars to a CSV file
pub fn save_bars<P: AsRef<Path>>(bars: &[PriceBar], path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    for bar in bars {
        writer.serialize(bar)?;
    }

    writer.flush()?;
    Ok(())
}

/// Generate hourly bars from a mean-reverting random walk
pub fn generate_random_walk(num_bars: usize, start_price: f64, volatility: f64, seed: u64) -> Vec<PriceBar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(num_bars);

    let start_ts = 1_600_000_000i64;
    let mut price = start_price;

    for i in 0..num_bars {
        let open = price;
        let change = rng.gen_range(-volatility..volatility) + 0.01 * volatility * (start_price - price) / start_price;
        let close = (open * (1.0 + change)).max(start_price * 0.1);

        let wick = rng.gen_range(0.0..volatility / 2.0);
        let high = open.max(close) * (1.0 + wick);
        let low = open.min(close) * (1.0 - wick);

        bars.push(PriceBar {
            timestamp: start_ts + i as i64 * 3600,
            open,
            high,
            low,
            close,
            volume: Some(rng.gen_range(100.0..1000.0)),
        });

        price = close;
    }

    bars
}
