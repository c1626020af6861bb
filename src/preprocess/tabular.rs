//! Scaling of (hardness, density) into the feature space of the classifier.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::types::PhysicalProperties;

/// Number of tabular features the classifier consumes: hardness, density.
pub const FEATURE_COUNT: usize = 2;

/// A scaling transform fitted by the training pipeline and exported as JSON.
///
/// ```json
/// {"kind": "standard", "mean": [5.1, 3.0], "scale": [1.9, 1.2]}
/// {"kind": "min_max", "min": [-0.1, 0.0], "scale": [0.1, 0.05]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedScaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl FittedScaler {
    pub fn validate(&self) -> Result<(), String> {
        let (offset, scale, offset_name) = match self {
            FittedScaler::Standard { mean, scale } => (mean, scale, "mean"),
            FittedScaler::MinMax { min, scale } => (min, scale, "min"),
        };
        if offset.len() != FEATURE_COUNT || scale.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {} values for '{}' and 'scale', got {} and {}",
                FEATURE_COUNT,
                offset_name,
                offset.len(),
                scale.len()
            ));
        }
        if offset.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".to_string());
        }
        if matches!(self, FittedScaler::Standard { .. }) && scale.contains(&0.0) {
            return Err("standard scaler has a zero scale".to_string());
        }
        Ok(())
    }

    fn apply(&self, raw: [f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, x) in raw.into_iter().enumerate() {
            out[i] = match self {
                FittedScaler::Standard { mean, scale } => (x - mean[i]) / scale[i],
                FittedScaler::MinMax { min, scale } => x * scale[i] + min[i],
            };
        }
        out
    }
}

/// Scaled tabular input of the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularFeatures(Vec<f32>);

impl TabularFeatures {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Batch of one, `[1, FEATURE_COUNT]`.
    pub fn to_batch(&self) -> Array2<f32> {
        Array2::from_shape_fn((1, self.0.len()), |(_, j)| self.0[j])
    }
}

#[derive(Debug, Clone)]
pub struct TabularNormalizer {
    scaler: FittedScaler,
}

impl TabularNormalizer {
    /// Fails if the scaler parameters are unusable.
    pub fn new(scaler: FittedScaler) -> Result<Self, String> {
        scaler.validate()?;
        Ok(Self { scaler })
    }

    pub fn normalize(&self, properties: &PhysicalProperties) -> TabularFeatures {
        let scaled = self
            .scaler
            .apply([properties.hardness, properties.density]);
        TabularFeatures(scaled.iter().map(|&v| v as f32).collect())
    }
}
