//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the exported classifier (model.onnx, config.json, ...)
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.tagsense/model"),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum source size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Timeout for fetching remote image references, in milliseconds
    pub fetch_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            fetch_timeout_ms: 30000,
        }
    }
}

/// What to do when one image in a live request cannot be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidImagePolicy {
    /// The whole request fails with the image error.
    #[default]
    Fail,
    /// The image is left out of the model batch; its record keeps its
    /// position with empty scores and ranking.
    Skip,
}

/// Inference pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Width every input image is resized to before batching
    pub resize_image_width: u32,

    /// Concurrent image normalizations across all requests (0 = available parallelism)
    pub normalize_workers: usize,

    /// Bad-image policy for live requests
    pub on_invalid_image: InvalidImagePolicy,

    /// Rewrite `C:\...` references to `/mnt/c/...` (WSL hosts)
    pub windows_path_rewrite: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            resize_image_width: 512,
            normalize_workers: 0,
            on_invalid_image: InvalidImagePolicy::Fail,
            windows_path_rewrite: false,
        }
    }
}

impl InferenceConfig {
    /// Resolved normalization concurrency.
    pub fn effective_normalize_workers(&self) -> usize {
        if self.normalize_workers == 0 {
            available_parallelism()
        } else {
            self.normalize_workers
        }
    }
}

/// gRPC server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub listen_addr: String,

    /// Worker tasks serving requests (0 = 2 × available parallelism)
    pub workers: usize,

    /// Requests allowed to wait for a worker before new ones are rejected
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "[::]:50051".to_string(),
            workers: 0,
            queue_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Resolved worker count.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            available_parallelism() * 2
        } else {
            self.workers
        }
    }
}

/// Dataset preprocessing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Width images are resized to
    pub target_width: u32,

    /// Rotation augmentation step in degrees (0 disables augmentation)
    pub rotation_step_degrees: u32,

    /// Fraction of source images moved to the validation split
    pub validation_ratio: f64,

    /// Seed for the train/validation shuffle
    pub seed: u64,

    /// Concurrent image jobs (0 = available parallelism)
    pub workers: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_width: 512,
            rotation_step_degrees: 45,
            validation_ratio: 0.2,
            seed: 42,
            workers: 0,
        }
    }
}

impl PreprocessConfig {
    /// Resolved worker count.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            available_parallelism()
        } else {
            self.workers
        }
    }

    /// Rotation angles applied to every source image, starting at 0.
    pub fn rotation_angles(&self) -> Vec<u32> {
        if self.rotation_step_degrees == 0 {
            return vec![0];
        }
        (0..360).step_by(self.rotation_step_degrees as usize).collect()
    }
}

/// Training hand-off settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Pretrained checkpoint the external trainer fine-tunes
    pub base_model: String,

    /// External trainer argv; input and output directories are appended
    pub command: Vec<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            base_model: "google/vit-base-patch16-224".to_string(),
            command: Vec::new(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
