//! Model Checkpointing
//!
//! Save and load policy-value network weights.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use tracing::{info, warn};

use crate::error::{FxError, Result};

const EXTENSION: &str = "mpk";

/// Checkpointer for saving and loading models
#[derive(Debug, Clone)]
pub struct Checkpointer {
    checkpoint_dir: PathBuf,
    /// Checkpoints kept after each save; 0 keeps everything
    max_checkpoints: usize,
}

impl Checkpointer {
    /// Create a checkpointer, creating the directory if needed
    pub fn new<P: AsRef<Path>>(checkpoint_dir: P, max_checkpoints: usize) -> Result<Self> {
        let checkpoint_dir = checkpoint_dir.as_ref().to_path_buf();
        fs::create_dir_all(&checkpoint_dir)?;

        Ok(Self {
            checkpoint_dir,
            max_checkpoints,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    /// Get checkpoint path for a given name
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.checkpoint_dir.join(format!("{}.{}", name, EXTENSION))
    }

    /// Save a model under `name`, then prune old checkpoints
    pub fn save<B, M>(&self, model: &M, name: &str) -> Result<PathBuf>
    where
        B: Backend,
        M: Module<B>,
    {
        let path = self.checkpoint_path(name);

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        model
            .clone()
            .save_file(path.clone(), &recorder)
            .map_err(|e| FxError::Checkpoint(format!("failed to save {:?}: {}", path, e)))?;

        info!("Saved checkpoint to {:?}", path);

        self.cleanup_old_checkpoints(name);

        Ok(path)
    }

    /// Load weights into `model`
    ///
    /// `model` must have been initialized with the same architecture the
    /// checkpoint was saved from.
    pub fn load<B, M>(&self, model: M, name: &str, device: &B::Device) -> Result<M>
    where
        B: Backend,
        M: Module<B>,
    {
        let path = self.checkpoint_path(name);

        if !path.exists() {
            return Err(FxError::Checkpoint(format!("checkpoint not found: {:?}", path)));
        }

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let model = model
            .load_file(path.clone(), &recorder, device)
            .map_err(|e| FxError::Checkpoint(format!("failed to load {:?}: {}", path, e)))?;

        info!("Loaded checkpoint from {:?}", path);
        Ok(model)
    }

    /// List available checkpoints, oldest first
    ///
    /// Ordered by file modification time, then by name.
    pub fn list_checkpoints(&self) -> Vec<String> {
        let mut checkpoints: Vec<(SystemTime, String)> = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.checkpoint_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        let modified = entry
                            .metadata()
                            .and_then(|m| m.modified())
                            .unwrap_or(SystemTime::UNIX_EPOCH);
                        checkpoints.push((modified, stem.to_string()));
                    }
                }
            }
        }

        checkpoints.sort();
        checkpoints.into_iter().map(|(_, name)| name).collect()
    }

    /// Most recently written checkpoint
    pub fn latest_checkpoint(&self) -> Option<String> {
        self.list_checkpoints().into_iter().last()
    }

    /// Remove the oldest checkpoints beyond `max_checkpoints`, never `keep`
    fn cleanup_old_checkpoints(&self, keep: &str) {
        if self.max_checkpoints == 0 {
            return;
        }

        let checkpoints: Vec<String> = self
            .list_checkpoints()
            .into_iter()
            .filter(|name| name != keep)
            .collect();

        let allowed = self.max_checkpoints - 1;
        if checkpoints.len() <= allowed {
            return;
        }

        let to_remove = checkpoints.len() - allowed;
        for name in checkpoints.into_iter().take(to_remove) {
            let path = self.checkpoint_path(&name);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old checkpoint {:?}: {}", path, e);
            } else {
                info!("Removed old checkpoint: {}", name);
            }
        }
    }

    /// Check if a checkpoint exists
    pub fn exists(&self, name: &str) -> bool {
        self.checkpoint_path(name).exists()
    }
}

/// Generate a checkpoint name with timestamp
pub fn timestamped_name(prefix: &str) -> String {
    let now = chrono::Utc::now();
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Generate a checkpoint name with episode number
pub fn episode_name(prefix: &str, episode: usize) -> String {
    format!("{}_ep{:06}", prefix, episode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Window;
    use crate::rl::networks::{tensor_to_vec, windows_to_tensor, PolicyValueModel, PolicyValueNetConfig};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_checkpoint_path() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path(), 5).unwrap();
        let path = checkpointer.checkpoint_path("model_v1");

        assert!(path.to_string_lossy().ends_with("model_v1.mpk"));
    }

    #[test]
    fn test_save_and_load_restores_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path(), 5).unwrap();
        let device = Default::default();
        let config = PolicyValueNetConfig::new(3, 2).with_hidden_dim(16).with_latent_dim(8);

        let model = config.init::<TestBackend>(&device);
        checkpointer.save(&model, "a2c").unwrap();
        assert!(checkpointer.exists("a2c"));

        let fresh = config.init::<TestBackend>(&device);
        let restored = checkpointer.load(fresh, "a2c", &device).unwrap();

        let window = Window::new(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3, 2).unwrap();
        let input = windows_to_tensor::<TestBackend>(&[window], &device).unwrap();
        let expected = tensor_to_vec(model.forward(input.clone()).logits).unwrap();
        let actual = tensor_to_vec(restored.forward(input).logits).unwrap();

        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path(), 5).unwrap();
        let device = Default::default();
        let model = PolicyValueNetConfig::new(3, 2).init::<TestBackend>(&device);

        let result = checkpointer.load(model, "missing", &device);
        assert!(matches!(result, Err(FxError::Checkpoint(_))));
    }

    #[test]
    fn test_retention_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path(), 2).unwrap();
        let device = Default::default();
        let model = PolicyValueNetConfig::new(2, 1).with_hidden_dim(4).with_latent_dim(4).init::<TestBackend>(&device);

        for episode in [10, 20, 30] {
            checkpointer.save(&model, &episode_name("a2c", episode)).unwrap();
        }

        assert_eq!(checkpointer.list_checkpoints(), vec!["a2c_ep000020", "a2c_ep000030"]);
        assert_eq!(checkpointer.latest_checkpoint().as_deref(), Some("a2c_ep000030"));
    }

    #[test]
    fn test_latest_follows_write_time_not_name() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path(), 2).unwrap();
        let device = Default::default();
        let model = PolicyValueNetConfig::new(2, 1).with_hidden_dim(4).with_latent_dim(4).init::<TestBackend>(&device);

        // A long earlier run, then an interrupted later one
        let old = checkpointer.save(&model, &episode_name("a2c", 100)).unwrap();
        let an_hour_ago = SystemTime::now() - std::time::Duration::from_secs(3600);
        fs::File::options().write(true).open(&old).unwrap().set_modified(an_hour_ago).unwrap();
        checkpointer.save(&model, &episode_name("a2c", 37)).unwrap();

        assert_eq!(checkpointer.latest_checkpoint().as_deref(), Some("a2c_ep000037"));

        // Retention drops the stale run, not the newer one
        checkpointer.save(&model, &episode_name("a2c", 50)).unwrap();
        assert!(!checkpointer.exists("a2c_ep000100"));
        assert!(checkpointer.exists("a2c_ep000037"));
        assert!(checkpointer.exists("a2c_ep000050"));
    }

    #[test]
    fn test_timestamped_name() {
        let name = timestamped_name("a2c");
        assert!(name.starts_with("a2c_"));
        assert!(name.len() > 10);
    }

    #[test]
    fn test_episode_name() {
        assert_eq!(episode_name("a2c", 100), "a2c_ep000100");
    }
}
