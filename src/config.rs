use std::num::NonZeroUsize;

use log::LevelFilter;

use crate::artifacts::ArtifactPaths;
use crate::orchestrator::PropertyBounds;
use crate::preprocess::ImageNormalizerConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Hardness scales used by the training data never exceed this.
const HARDNESS_LIMIT: f64 = 20.0;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// ONNX sessions kept for concurrent inference. Defaults to the number
    /// of HTTP workers.
    pub session_pool_size: Option<usize>,
    pub artifacts: ArtifactPaths,
    pub image: ImageNormalizerConfig,
    pub bounds: PropertyBounds,
    /// Largest accepted image upload in bytes.
    pub max_image_bytes: usize,
    pub log_level: LevelFilter,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            workers: None,
            session_pool_size: None,
            artifacts: ArtifactPaths::default(),
            image: ImageNormalizerConfig::default(),
            bounds: PropertyBounds::default(),
            max_image_bytes: 16 * 1024 * 1024,
            log_level: LevelFilter::Info,
        }
    }
}

impl ServerConfig {
    /// Sessions to create for the learned model: the explicit pool size, else
    /// one per HTTP worker, else one per available CPU.
    pub fn inference_sessions(&self) -> usize {
        self.session_pool_size.or(self.workers).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "host".to_string(),
            });
        }
        if self.workers == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "workers".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        if self.session_pool_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "session_pool_size".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        if self.artifacts.scaler.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "scaler_path".to_string(),
            });
        }
        if self.artifacts.label_encoder.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "label_encoder_path".to_string(),
            });
        }
        if self.image.width == 0 || self.image.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "image_size".to_string(),
                value: format!("{}x{}", self.image.width, self.image.height),
                reason: "Must be non-zero".to_string(),
            });
        }
        let max_hardness = self.bounds.max_hardness;
        if !(max_hardness > 0.0 && max_hardness <= HARDNESS_LIMIT) {
            return Err(ConfigError::InvalidValue {
                field: "max_hardness".to_string(),
                value: max_hardness.to_string(),
                reason: format!("Must be in (0, {}]", HARDNESS_LIMIT),
            });
        }
        let max_density = self.bounds.max_density;
        if !(max_density.is_finite() && max_density > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "max_density".to_string(),
                value: max_density.to_string(),
                reason: "Must be a positive number".to_string(),
            });
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_image_bytes".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
