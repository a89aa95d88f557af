use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::SplitSpec;
use crate::error::{FxError, Result};
use crate::rl::networks::encoder::{ENCODER_HIDDEN_DIM, ENCODER_OUTPUT_DIM};
use crate::rl::{A2CConfig, PretrainConfig, TradingEnvConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub env: TradingEnvConfig,
    #[serde(default)]
    pub pretrain: PretrainConfig,
    #[serde(default)]
    pub a2c: A2CConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// OHLCV CSV file; synthetic bars are generated when unset
    pub csv_path: Option<PathBuf>,
    /// Number of synthetic bars
    pub synthetic_bars: usize,
    /// Starting price of the synthetic walk
    pub start_price: f64,
    /// Per-bar volatility of the synthetic walk
    pub volatility: f64,
    /// Seed of the synthetic walk
    pub seed: u64,
    pub seq_len: usize,
    /// Bars between the last window row and the label
    pub horizon: usize,
    pub train_fraction: f64,
    pub val_fraction: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        let split = SplitSpec::default();
        Self {
            csv_path: None,
            synthetic_bars: 2000,
            start_price: 1.10,
            volatility: 0.002,
            seed: 7,
            seq_len: split.seq_len,
            horizon: split.horizon,
            train_fraction: split.train_fraction,
            val_fraction: split.val_fraction,
        }
    }
}

impl DataConfig {
    pub fn split_spec(&self) -> SplitSpec {
        SplitSpec {
            seq_len: self.seq_len,
            horizon: self.horizon,
            train_fraction: self.train_fraction,
            val_fraction: self.val_fraction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Hidden width of the window encoder
    pub hidden_dim: usize,
    /// Latent width shared by the forecast, policy and value heads
    pub latent_dim: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_dim: ENCODER_HIDDEN_DIM,
            latent_dim: ENCODER_OUTPUT_DIM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub checkpoint_dir: PathBuf,
    /// Checkpoint name prefix
    pub model_name: String,
    /// Checkpoints kept in `checkpoint_dir`; 0 keeps everything
    pub max_checkpoints: usize,
    /// Run report file name, relative to `checkpoint_dir`
    pub report_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./checkpoints"),
            model_name: "fxagent".to_string(),
            max_checkpoints: 5,
            report_file: "report.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily-rolling log files
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("FXAGENT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (FXAGENT__A2C__EPISODES, etc.)
            .add_source(
                Environment::with_prefix("FXAGENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let data = &self.data;
        if data.seq_len == 0 || data.horizon == 0 {
            return Err(FxError::InvalidConfig("data.seq_len and data.horizon must be positive".to_string()));
        }
        if data.csv_path.is_none() && !(data.volatility > 0.0 && data.start_price > 0.0) {
            return Err(FxError::InvalidConfig(
                "data.volatility and data.start_price must be positive".to_string(),
            ));
        }
        if !(self.a2c.gamma > 0.0 && self.a2c.gamma < 1.0) {
            return Err(FxError::InvalidConfig(format!("a2c.gamma {} outside (0, 1)", self.a2c.gamma)));
        }
        if self.a2c.lr <= 0.0 || self.pretrain.lr <= 0.0 {
            return Err(FxError::InvalidConfig("learning rates must be positive".to_string()));
        }
        if self.env.commission_rate < 0.0 {
            return Err(FxError::InvalidConfig("env.commission_rate must not be negative".to_string()));
        }
        if self.model.hidden_dim == 0 || self.model.latent_dim == 0 {
            return Err(FxError::InvalidConfig("model dimensions must be positive".to_string()));
        }
        Ok(())
    }

    /// Render as TOML, e.g. for `config/default.toml`
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output.checkpoint_dir.join(&self.output.report_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.a2c.gamma, 0.99);
        assert_eq!(config.a2c.value_coef, 0.5);
        assert_eq!(config.a2c.entropy_coef, 0.0);
        assert!(!config.a2c.normalize_advantages);
        assert_eq!(config.env.commission_rate, 0.0001);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[a2c]\nepisodes = 7\ngamma = 0.9\n\n[env]\ncommission_rate = 0.0\n",
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.a2c.episodes, 7);
        assert!((config.a2c.gamma - 0.9).abs() < 1e-6);
        assert_eq!(config.env.commission_rate, 0.0);
        // Untouched sections keep their defaults
        assert_eq!(config.pretrain.batch_size, 32);
        assert_eq!(config.data.seq_len, 30);
    }

    #[test]
    fn test_rendered_toml_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.pretrain.epochs = 3;
        std::fs::write(dir.path().join("default.toml"), config.to_toml().unwrap()).unwrap();

        let loaded = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(loaded.pretrain.epochs, 3);
        assert_eq!(loaded.output.model_name, "fxagent");
    }

    #[test]
    fn test_validate_rejects_bad_gamma() {
        let mut config = AppConfig::default();
        for gamma in [1.5, 1.0, 0.0, -0.1, f32::NAN] {
            config.a2c.gamma = gamma;
            assert!(
                matches!(config.validate(), Err(FxError::InvalidConfig(_))),
                "gamma {} accepted",
                gamma
            );
        }

        config.a2c.gamma = 0.5;
        assert!(config.validate().is_ok());
    }
}
