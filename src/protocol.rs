//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Method, PhysicalProperties, PredictionResult};

/// Raw form fields. Values stay strings until parsed so that a malformed
/// number can be reported by field name.
///
/// `durete`/`densite` are accepted as aliases. A field repeated under either
/// name keeps its last value, whatever the body encoding.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PropertiesForm {
    pub hardness: Option<String>,
    pub density: Option<String>,
}

impl PropertiesForm {
    /// Build from decoded `name=value` pairs in body order.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = Self::default();
        for (name, value) in pairs {
            if !form.set_field(&name, value) {
                log::debug!("Ignoring unknown form field '{}'", name);
            }
        }
        form
    }

    /// Store a form field by name. Returns false for unknown fields.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        match name {
            "hardness" | "durete" => self.hardness = Some(value),
            "density" | "densite" => self.density = Some(value),
            _ => return false,
        }
        true
    }

    pub fn into_properties(self) -> Result<PhysicalProperties, ValidationError> {
        let hardness = parse_field("hardness", self.hardness)?;
        let density = parse_field("density", self.density)?;
        Ok(PhysicalProperties::new(hardness, density))
    }
}

fn parse_field(field: &'static str, value: Option<String>) -> Result<f64, ValidationError> {
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ValidationError::MissingField(field))?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NotANumber { field, value })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_mineral: String,
    pub confidence: f64,
    pub method: Method,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            predicted_mineral: result.mineral_label,
            confidence: result.confidence,
            method: result.method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}
