//! Configuration management for tagsense.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a partial file is fine.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Inference pipeline settings
    pub inference: InferenceConfig,

    /// gRPC server settings
    pub server: ServerConfig,

    /// Dataset preprocessing settings
    pub preprocess: PreprocessConfig,

    /// Training hand-off settings
    pub train: TrainConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.tagsense.tagsense/config.toml
    /// - Linux: ~/.config/tagsense/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\tagsense\config\config.toml
    ///
    /// Falls back to ~/.tagsense/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "tagsense", "tagsense")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".tagsense").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        expand(&self.general.model_dir)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.inference.resize_image_width, 512);
        assert_eq!(config.server.listen_addr, "[::]:50051");
        assert_eq!(config.inference.on_invalid_image, InvalidImagePolicy::Fail);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[inference]"));
        assert!(toml.contains("on_invalid_image = \"fail\""));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[inference]\non_invalid_image = \"skip\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.inference.on_invalid_image, InvalidImagePolicy::Skip);
        assert_eq!(config.inference.resize_image_width, 512);
        assert_eq!(config.server.queue_capacity, 64);
    }

    #[test]
    fn test_rotation_angles() {
        let mut config = PreprocessConfig::default();
        assert_eq!(
            config.rotation_angles(),
            vec![0, 45, 90, 135, 180, 225, 270, 315]
        );

        config.rotation_step_degrees = 0;
        assert_eq!(config.rotation_angles(), vec![0]);
    }

    #[test]
    fn test_effective_workers_auto() {
        let config = ServerConfig::default();
        assert!(config.effective_workers() >= 2);

        let config = ServerConfig {
            workers: 3,
            ..ServerConfig::default()
        };
        assert_eq!(config.effective_workers(), 3);
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand(Path::new("~/models"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
