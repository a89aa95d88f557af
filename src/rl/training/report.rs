//! Run Report
//!
//! JSON summary of one training run, written next to the checkpoint.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::evaluation::{BacktestResult, ForecastMetrics};
use super::pretrain::PretrainReport;
use super::trainer::TrainingSummary;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub created_at: DateTime<Utc>,
    /// Name of the saved checkpoint, if any
    pub checkpoint: Option<String>,
    pub pretrain: PretrainReport,
    pub training: TrainingSummary,
    /// Forecast accuracy on the test split
    pub forecast: ForecastMetrics,
    pub backtest: BacktestResult,
    /// Whether training ended early on a stop request
    pub interrupted: bool,
}

impl RunReport {
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Wrote run report to {:?}", path);
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("report.json");

        let report = RunReport {
            created_at: Utc::now(),
            checkpoint: Some("a2c_ep000100".to_string()),
            pretrain: PretrainReport::default(),
            training: TrainingSummary {
                num_episodes: 100,
                ..Default::default()
            },
            forecast: ForecastMetrics::default(),
            backtest: BacktestResult {
                action_counts: [1, 2, 3],
                ..Default::default()
            },
            interrupted: false,
        };
        report.save_json(&path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["training"]["num_episodes"], 100);
        assert_eq!(json["backtest"]["action_counts"][2], 3);

        let loaded = RunReport::load_json(&path).unwrap();
        assert_eq!(loaded.checkpoint.as_deref(), Some("a2c_ep000100"));
    }
}
