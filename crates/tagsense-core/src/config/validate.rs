//! Configuration validation with range checks.

use std::net::SocketAddr;

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inference.resize_image_width == 0 {
            return Err(ConfigError::ValidationError(
                "inference.resize_image_width must be > 0".into(),
            ));
        }
        if self.preprocess.target_width == 0 {
            return Err(ConfigError::ValidationError(
                "preprocess.target_width must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.preprocess.validation_ratio) {
            return Err(ConfigError::ValidationError(
                "preprocess.validation_ratio must be in [0.0, 1.0)".into(),
            ));
        }
        if self.preprocess.rotation_step_degrees >= 360 {
            return Err(ConfigError::ValidationError(
                "preprocess.rotation_step_degrees must be < 360".into(),
            ));
        }
        if self.server.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "server.queue_capacity must be > 0".into(),
            ));
        }
        if self.server.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "server.listen_addr {:?} is not a socket address",
                self.server.listen_addr
            )));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.fetch_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.fetch_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
