use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{InferenceError, MineralClassifier};
use crate::preprocess::{ImageTensor, TabularFeatures};

/// Maps class indices of the model output back to mineral names, in the order
/// the training pipeline's label encoder assigned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDecoder {
    classes: Vec<String>,
}

impl LabelDecoder {
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        let decoder = Self { classes };
        decoder.validate()?;
        Ok(decoder)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("label encoder has no classes".to_string());
        }
        if self.classes.iter().any(|c| c.trim().is_empty()) {
            return Err("label encoder contains an empty class name".to_string());
        }
        Ok(())
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Index and value of the largest probability. Ties resolve to the first index.
///
/// Every value must be a probability in `[0, 1]`; logits or otherwise scaled
/// scores are rejected so the reported confidence stays a percentage.
pub fn argmax(probabilities: &[f32]) -> Result<(usize, f32), InferenceError> {
    if probabilities.is_empty() {
        return Err(InferenceError::InvalidOutput(
            "empty probability vector".to_string(),
        ));
    }
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
        return Err(InferenceError::InvalidOutput(format!(
            "non-finite probability {}",
            bad
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(InferenceError::InvalidOutput(format!(
            "probability {} is outside [0, 1]",
            bad
        )));
    }
    let mut best = (0, probabilities[0]);
    for (i, &p) in probabilities.iter().enumerate().skip(1) {
        if p > best.1 {
            best = (i, p);
        }
    }
    Ok(best)
}

/// A loaded model paired with its label decoder.
#[derive(Debug)]
pub struct LearnedClassifier {
    model: Box<dyn MineralClassifier>,
    labels: Arc<LabelDecoder>,
}

impl LearnedClassifier {
    pub fn new(model: Box<dyn MineralClassifier>, labels: Arc<LabelDecoder>) -> Self {
        Self { model, labels }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Returns the decoded label and the confidence as a percentage.
    pub fn predict(
        &self,
        image: &ImageTensor,
        features: &TabularFeatures,
    ) -> Result<(String, f64), InferenceError> {
        let probabilities = self.model.predict_proba(image, features)?;
        let (index, max) = argmax(&probabilities)?;
        let label = self
            .labels
            .decode(index)
            .ok_or(InferenceError::UnknownClass {
                index,
                classes: self.labels.len(),
            })?;
        Ok((label.to_string(), f64::from(max) * 100.0))
    }
}
