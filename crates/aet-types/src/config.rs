use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config_error;
use crate::errors::AetResult;

/// Default number of training epochs per configuration.
pub const DEFAULT_EPOCHS: usize = 20;

/// Default width of the EEG feature vectors fed to the autoencoders.
pub const DEFAULT_INPUT_DIM: usize = 256;

pub const ENV_MODELS_DIR: &str = "AETUNE_MODELS_DIR";
pub const ENV_RESULTS_DIR: &str = "AETUNE_RESULTS_DIR";
pub const ENV_EPOCHS: &str = "AETUNE_EPOCHS";

/// What the search driver does when one configuration fails to train or score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole search and return the error.
    #[default]
    Abort,
    /// Record the failure in the result list and move on.
    Skip,
}

/// Settings shared by every search in a tuning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Where best-model weights and descriptors are written.
    pub models_dir: PathBuf,
    /// Where per-run result files are written.
    pub results_dir: PathBuf,
    pub epochs: usize,
    pub input_dim: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for TuningConfig {
    fn default() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aetune");
        Self::rooted_at(root)
    }
}

impl TuningConfig {
    /// Default settings with both output directories under `root`.
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            models_dir: root.join("models"),
            results_dir: root.join("hyperparam_results"),
            epochs: DEFAULT_EPOCHS,
            input_dim: DEFAULT_INPUT_DIM,
            failure_policy: FailurePolicy::Abort,
        }
    }

    /// Load settings from a JSON file; missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AetResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AETUNE_*` environment overrides.
    pub fn with_env_overrides(self) -> AetResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> AetResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_MODELS_DIR) {
            self.models_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_RESULTS_DIR) {
            self.results_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_EPOCHS) {
            self.epochs = raw
                .trim()
                .parse()
                .map_err(|_| config_error!("{} must be a positive integer, got {:?}", ENV_EPOCHS, raw))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_input_dim(mut self, input_dim: usize) -> Self {
        self.input_dim = input_dim;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn validate(&self) -> AetResult<()> {
        if self.epochs == 0 {
            return Err(config_error!("epochs must be positive"));
        }
        if self.input_dim == 0 {
            return Err(config_error!("input_dim must be positive"));
        }
        if self.models_dir.as_os_str().is_empty() || self.results_dir.as_os_str().is_empty() {
            return Err(config_error!("output directories must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AetError;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn rooted_config_uses_subdirectories() {
        let config = TuningConfig::rooted_at("/tmp/run");
        assert_eq!(config.models_dir, PathBuf::from("/tmp/run/models"));
        assert_eq!(config.results_dir, PathBuf::from("/tmp/run/hyperparam_results"));
        assert_eq!(config.epochs, DEFAULT_EPOCHS);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_fields_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tune.json");
        std::fs::write(&path, r#"{"epochs": 5, "failure_policy": "skip"}"#).unwrap();

        let config = TuningConfig::from_file(&path).unwrap();
        assert_eq!(config.epochs, 5);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.input_dim, DEFAULT_INPUT_DIM);
    }

    #[test]
    fn zero_epochs_rejected() {
        let config = TuningConfig::rooted_at("/tmp/run").with_epochs(0);
        assert!(matches!(config.validate(), Err(AetError::Config(_))));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            (ENV_RESULTS_DIR, "/data/results"),
            (ENV_EPOCHS, "12"),
        ]
        .into_iter()
        .collect();

        let config = TuningConfig::rooted_at("/tmp/run")
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.results_dir, PathBuf::from("/data/results"));
        assert_eq!(config.models_dir, PathBuf::from("/tmp/run/models"));
        assert_eq!(config.epochs, 12);
    }

    #[test]
    fn bad_epoch_override_is_config_error() {
        let result = TuningConfig::rooted_at("/tmp/run")
            .with_overrides(|key| (key == ENV_EPOCHS).then(|| "many".to_string()));
        assert!(matches!(result, Err(AetError::Config(_))));
    }
}
