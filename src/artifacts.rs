//! Startup artifacts: the fitted scaler, the label encoder and the optional
//! learned model.
//!
//! Everything here is loaded exactly once and then shared read-only by all
//! requests. A missing or corrupt scaler or label encoder aborts startup; a
//! missing or broken model only disables the learned path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::classifier::{ClassifierAvailability, LabelDecoder, LearnedClassifier, MineralClassifier};
use crate::preprocess::{FittedScaler, TabularNormalizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Scaler,
    LabelEncoder,
    Model,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Scaler => write!(f, "scaler"),
            ArtifactKind::LabelEncoder => write!(f, "label encoder"),
            ArtifactKind::Model => write!(f, "model"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found at {}", .path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error("failed to read {kind} artifact at {}: {source}", .path.display())]
    Io {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {kind} artifact at {}: {source}", .path.display())]
    Parse {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {kind} artifact at {}: {reason}", .path.display())]
    Invalid {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error("failed to load model from {}: {reason}", .path.display())]
    Model { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub scaler: PathBuf,
    pub label_encoder: PathBuf,
    pub model: Option<PathBuf>,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            scaler: PathBuf::from("scaler.json"),
            label_encoder: PathBuf::from("label_encoder.json"),
            model: Some(PathBuf::from("model.onnx")),
        }
    }
}

/// The immutable context every prediction runs against.
#[derive(Debug)]
pub struct ArtifactContext {
    pub tabular: TabularNormalizer,
    pub classifier: ClassifierAvailability,
}

impl ArtifactContext {
    /// Load all artifacts. The model, if any, gets `session_pool_size`
    /// inference sessions so that that many requests can run it at once.
    pub fn load(paths: &ArtifactPaths, session_pool_size: usize) -> Result<Self, ArtifactError> {
        let scaler: FittedScaler = read_json(ArtifactKind::Scaler, &paths.scaler)?;
        let tabular = TabularNormalizer::new(scaler).map_err(|reason| ArtifactError::Invalid {
            kind: ArtifactKind::Scaler,
            path: paths.scaler.clone(),
            reason,
        })?;
        log::info!("Loaded scaler from {}", paths.scaler.display());

        let labels: LabelDecoder = read_json(ArtifactKind::LabelEncoder, &paths.label_encoder)?;
        labels.validate().map_err(|reason| ArtifactError::Invalid {
            kind: ArtifactKind::LabelEncoder,
            path: paths.label_encoder.clone(),
            reason,
        })?;
        log::info!(
            "Loaded label encoder from {} ({} classes)",
            paths.label_encoder.display(),
            labels.len()
        );
        let labels = Arc::new(labels);

        let classifier = match &paths.model {
            None => ClassifierAvailability::Unavailable {
                reason: "no model path configured".to_string(),
            },
            Some(path) => match load_model(path, session_pool_size) {
                Ok(model) => {
                    ClassifierAvailability::Available(LearnedClassifier::new(model, labels))
                }
                Err(e) => ClassifierAvailability::Unavailable {
                    reason: e.to_string(),
                },
            },
        };
        match &classifier {
            ClassifierAvailability::Available(c) => {
                log::info!("Learned classifier available ({})", c.model_name())
            }
            ClassifierAvailability::Unavailable { reason } => {
                log::warn!("Learned classifier unavailable: {}", reason);
                log::warn!("Predictions will use the rule-based classifier only");
            }
        }

        Ok(Self {
            tabular,
            classifier,
        })
    }

    /// Assemble a context from already loaded parts, e.g. a model served by a
    /// backend other than ONNX Runtime.
    pub fn from_parts(
        tabular: TabularNormalizer,
        labels: LabelDecoder,
        model: Option<Box<dyn MineralClassifier>>,
    ) -> Self {
        let labels = Arc::new(labels);
        let classifier = match model {
            Some(model) => ClassifierAvailability::Available(LearnedClassifier::new(model, labels)),
            None => ClassifierAvailability::Unavailable {
                reason: "no model supplied".to_string(),
            },
        };
        Self {
            tabular,
            classifier,
        }
    }
}

fn read_json<T: DeserializeOwned>(kind: ArtifactKind, path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            kind,
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ArtifactError::Parse {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(feature = "onnx")]
fn load_model(
    path: &Path,
    session_pool_size: usize,
) -> Result<Box<dyn MineralClassifier>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            kind: ArtifactKind::Model,
            path: path.to_path_buf(),
        });
    }
    let model = crate::classifier::onnx::OnnxClassifier::load(path, session_pool_size)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "onnx"))]
fn load_model(
    path: &Path,
    _session_pool_size: usize,
) -> Result<Box<dyn MineralClassifier>, ArtifactError> {
    Err(ArtifactError::Model {
        path: path.to_path_buf(),
        reason: "built without the `onnx` feature".to_string(),
    })
}
