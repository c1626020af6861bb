//! The prediction pipeline.
//!
//! ```text
//! VALIDATING ──► REJECTED
//!     │
//!     ▼
//! NORMALIZING ──► LEARNED_ATTEMPT ──► RESULT (learned)
//!                      │
//!                      ▼
//!               FALLBACK_ATTEMPT ──► RESULT (rule_based)
//! ```
//!
//! Validation and decode errors end the request. Inference errors never do:
//! they are logged and the rule table answers instead.

use std::fmt;

use bytes::Bytes;

use crate::artifacts::ArtifactContext;
use crate::classifier::{ClassifierAvailability, RuleBasedClassifier};
use crate::error::{PredictResult, ValidationError};
use crate::preprocess::{ImageNormalizer, ImageTensor, TabularFeatures};
use crate::types::{Method, PhysicalProperties, PredictionResult};

/// Accepted ranges for the physical properties. Values outside are rejected,
/// never clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyBounds {
    pub max_hardness: f64,
    pub max_density: f64,
}

impl Default for PropertyBounds {
    fn default() -> Self {
        Self {
            max_hardness: 10.0,
            max_density: 20.0,
        }
    }
}

impl PropertyBounds {
    pub fn check(&self, properties: &PhysicalProperties) -> Result<(), ValidationError> {
        check_range("hardness", properties.hardness, self.max_hardness)?;
        check_range("density", properties.density, self.max_density)
    }
}

fn check_range(field: &'static str, value: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails the range test as well.
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: 0.0,
            max,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub image: Option<Bytes>,
    pub properties: PhysicalProperties,
}

impl PredictionRequest {
    pub fn new(image: Option<Bytes>, properties: PhysicalProperties) -> Self {
        Self { image, properties }
    }

    pub fn without_image(properties: PhysicalProperties) -> Self {
        Self::new(None, properties)
    }
}

/// Why the rule table answered instead of the learned classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    ClassifierUnavailable,
    NoImage,
    InferenceFailed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::ClassifierUnavailable => write!(f, "learned classifier unavailable"),
            FallbackReason::NoImage => write!(f, "no image supplied"),
            FallbackReason::InferenceFailed(e) => write!(f, "inference failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub result: PredictionResult,
    /// Set when the result came from the rule-based classifier.
    pub fallback: Option<FallbackReason>,
}

#[derive(Debug)]
pub struct Predictor {
    artifacts: ArtifactContext,
    image: ImageNormalizer,
    bounds: PropertyBounds,
    rules: RuleBasedClassifier,
}

impl Predictor {
    pub fn new(artifacts: ArtifactContext, image: ImageNormalizer, bounds: PropertyBounds) -> Self {
        Self {
            artifacts,
            image,
            bounds,
            rules: RuleBasedClassifier,
        }
    }

    pub fn model_available(&self) -> bool {
        self.artifacts.classifier.is_available()
    }

    pub fn model_status(&self) -> &'static str {
        self.artifacts.classifier.status()
    }

    pub fn predict(&self, request: &PredictionRequest) -> PredictResult<PredictionOutcome> {
        let properties = request.properties;
        self.bounds.check(&properties)?;

        let image = match &request.image {
            Some(bytes) => Some(self.image.normalize(bytes)?),
            None => None,
        };
        let features = self.artifacts.tabular.normalize(&properties);

        let fallback = match self.attempt_learned(image.as_ref(), &features) {
            Ok(result) => {
                return Ok(PredictionOutcome {
                    result,
                    fallback: None,
                });
            }
            Err(reason) => reason,
        };

        match &fallback {
            FallbackReason::InferenceFailed(e) => {
                log::warn!("Learned prediction failed, using rule-based classifier: {}", e)
            }
            reason => log::debug!("Using rule-based classifier: {}", reason),
        }
        let (label, confidence) = self.rules.classify(&properties);
        Ok(PredictionOutcome {
            result: PredictionResult {
                mineral_label: label.to_string(),
                confidence,
                method: Method::RuleBased,
            },
            fallback: Some(fallback),
        })
    }

    fn attempt_learned(
        &self,
        image: Option<&ImageTensor>,
        features: &TabularFeatures,
    ) -> Result<PredictionResult, FallbackReason> {
        let ClassifierAvailability::Available(classifier) = &self.artifacts.classifier else {
            return Err(FallbackReason::ClassifierUnavailable);
        };
        let image = image.ok_or(FallbackReason::NoImage)?;
        let (label, confidence) = classifier
            .predict(image, features)
            .map_err(|e| FallbackReason::InferenceFailed(e.to_string()))?;
        Ok(PredictionResult {
            mineral_label: label,
            confidence,
            method: Method::Learned,
        })
    }
}
