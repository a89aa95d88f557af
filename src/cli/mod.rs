//! fxagent CLI
//!
//! Commands:
//! - `fxagent train` - Pretrain the forecaster, then train the A2C policy
//! - `fxagent eval` - Evaluate a saved checkpoint on the test split
//! - `fxagent init-config` - Write the default configuration as TOML

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;

/// Forex forecast-then-trade agent
#[derive(Parser, Debug)]
#[command(name = "fxagent")]
#[command(author, version, about = "Forecast pretraining and actor-critic trading on price windows")]
pub struct Cli {
    /// Directory holding default.toml and environment overrides
    #[arg(long, global = true, default_value = "config", env = "FXAGENT_CONFIG_DIR")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pretrain the forecast head, then train the trading policy
    Train {
        #[command(flatten)]
        data: DataArgs,
        /// Actor-critic episodes
        #[arg(long)]
        episodes: Option<usize>,
        /// Forecast pretraining epochs
        #[arg(long)]
        pretrain_epochs: Option<usize>,
        /// Seed for sampling, shuffling and synthetic data
        #[arg(long)]
        seed: Option<u64>,
        /// Where checkpoints and the run report are written
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,
    },

    /// Evaluate a checkpoint on the test split
    Eval {
        /// Checkpoint name; defaults to the newest one
        #[arg(long)]
        model: Option<String>,
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,
    },

    /// Write the default configuration as TOML
    InitConfig {
        /// Output file; printed to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Price data source
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// OHLCV CSV file (timestamp,open,high,low,close,volume)
    #[arg(long, conflicts_with = "synthetic")]
    pub data: Option<PathBuf>,
    /// Generate this many synthetic bars instead of reading a file
    #[arg(long)]
    pub synthetic: Option<usize>,
}

impl DataArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.data {
            config.data.csv_path = Some(path.clone());
        }
        if let Some(n) = self.synthetic {
            config.data.csv_path = None;
            config.data.synthetic_bars = n;
        }
    }
}

impl Commands {
    /// Overlay command-line flags on the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        match self {
            Commands::Train {
                data,
                episodes,
                pretrain_epochs,
                seed,
                checkpoint_dir,
            } => {
                data.apply(config);
                if let Some(n) = episodes {
                    config.a2c.episodes = *n;
                }
                if let Some(n) = pretrain_epochs {
                    config.pretrain.epochs = *n;
                }
                if let Some(seed) = seed {
                    config.a2c.seed = *seed;
                    config.pretrain.seed = *seed;
                    config.data.seed = *seed;
                }
                if let Some(dir) = checkpoint_dir {
                    config.output.checkpoint_dir = dir.clone();
                }
            }
            Commands::Eval {
                data, checkpoint_dir, ..
            } => {
                data.apply(config);
                if let Some(dir) = checkpoint_dir {
                    config.output.checkpoint_dir = dir.clone();
                }
            }
            Commands::InitConfig { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_overrides() {
        let cli = Cli::try_parse_from([
            "fxagent",
            "train",
            "--synthetic",
            "500",
            "--episodes",
            "12",
            "--seed",
            "3",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        cli.command.apply_overrides(&mut config);

        assert_eq!(config.data.synthetic_bars, 500);
        assert_eq!(config.a2c.episodes, 12);
        assert_eq!(config.a2c.seed, 3);
        assert_eq!(config.pretrain.seed, 3);
        assert_eq!(config.pretrain.epochs, AppConfig::default().pretrain.epochs);
    }

    #[test]
    fn test_data_and_synthetic_conflict() {
        let result = Cli::try_parse_from(["fxagent", "train", "--data", "bars.csv", "--synthetic", "10"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_eval_parses_model() {
        let cli = Cli::try_parse_from(["fxagent", "eval", "--model", "fxagent_ep000100"]).unwrap();
        match cli.command {
            Commands::Eval { model, .. } => assert_eq!(model.as_deref(), Some("fxagent_ep000100")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
