use std::fmt;

use serde::{Deserialize, Serialize};

/// Measured physical properties of a specimen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalProperties {
    /// Mohs hardness.
    pub hardness: f64,
    /// Density in g/cm³.
    pub density: f64,
}

impl PhysicalProperties {
    pub fn new(hardness: f64, density: f64) -> Self {
        Self { hardness, density }
    }
}

/// Which classifier produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Learned,
    RuleBased,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Learned => write!(f, "learned"),
            Method::RuleBased => write!(f, "rule_based"),
        }
    }
}

/// The single output of the predictor. Confidence is a percentage in [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub mineral_label: String,
    pub confidence: f64,
    pub method: Method,
}

impl PredictionResult {
    pub fn to_string(&self) -> String {
        format!(
            "{} ({:.1}%, {})",
            self.mineral_label, self.confidence, self.method
        )
    }
}
