//! Deterministic fallback classifier.
//!
//! The thresholds overlap, so the table is an ordered cascade where the first
//! matching row wins. Labels and confidences are part of the public contract.

use crate::types::PhysicalProperties;

struct Rule {
    min_hardness: f64,
    min_density: f64,
    label: &'static str,
    confidence: f64,
}

const RULES: [Rule; 5] = [
    Rule {
        min_hardness: 7.0,
        min_density: 3.5,
        label: "Diamant",
        confidence: 95.0,
    },
    Rule {
        min_hardness: 6.0,
        min_density: 2.6,
        label: "Quartz",
        confidence: 88.0,
    },
    Rule {
        min_hardness: 5.0,
        min_density: 2.5,
        label: "Feldspath",
        confidence: 85.0,
    },
    Rule {
        min_hardness: 4.0,
        min_density: 2.2,
        label: "Calcite",
        confidence: 82.0,
    },
    Rule {
        min_hardness: 3.0,
        min_density: 2.0,
        label: "Gypse",
        confidence: 78.0,
    },
];

pub const DEFAULT_LABEL: &str = "Minéral commun";
pub const DEFAULT_CONFIDENCE: f64 = 70.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub fn classify(&self, properties: &PhysicalProperties) -> (&'static str, f64) {
        RULES
            .iter()
            .find(|rule| {
                properties.hardness >= rule.min_hardness && properties.density >= rule.min_density
            })
            .map(|rule| (rule.label, rule.confidence))
            .unwrap_or((DEFAULT_LABEL, DEFAULT_CONFIDENCE))
    }
}
