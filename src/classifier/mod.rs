//! Mineral classifiers: the learned model adapter and the rule table fallback.

pub mod learned;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pool;
pub mod rules;

use std::fmt::Debug;

use thiserror::Error;

use crate::preprocess::{ImageTensor, TabularFeatures};

pub use learned::{LabelDecoder, LearnedClassifier};
pub use pool::SessionPool;
pub use rules::RuleBasedClassifier;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("model forward pass failed: {0}")]
    Backend(String),

    #[error("unexpected model output: {0}")]
    InvalidOutput(String),

    #[error("predicted class index {index} is outside the {classes} known labels")]
    UnknownClass { index: usize, classes: usize },
}

/// A trained two-input model: image tensor and scaled tabular features in,
/// one probability per known mineral class out.
///
/// Implementations are shared by all in-flight requests and must not mutate
/// the loaded model.
pub trait MineralClassifier: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn predict_proba(
        &self,
        image: &ImageTensor,
        features: &TabularFeatures,
    ) -> Result<Vec<f32>, InferenceError>;
}

/// Whether the learned path exists for this process. Decided once at startup.
#[derive(Debug)]
pub enum ClassifierAvailability {
    Available(LearnedClassifier),
    Unavailable { reason: String },
}

impl ClassifierAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, ClassifierAvailability::Available(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            ClassifierAvailability::Available(_) => "loaded",
            ClassifierAvailability::Unavailable { .. } => "unavailable",
        }
    }
}
