use thiserror::Error;

/// Client-side input errors. The message names the offending field so it can
/// be returned verbatim to the caller.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Worded in English and French; existing French clients match on the latter.
    #[error(
        "{field} must be between {min} and {max} ({} doit être entre {min} et {max})",
        french_name(.field)
    )]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} must be a number, got '{value}'")]
    NotANumber { field: &'static str, value: String },

    #[error("image exceeds the {limit} byte upload limit")]
    ImageTooLarge { limit: usize },
}

fn french_name(field: &str) -> &str {
    match field {
        "hardness" => "Dureté",
        "density" => "Densité",
        other => other,
    }
}

/// The supplied image bytes are not a readable JPEG/PNG.
#[derive(Debug, Error)]
#[error("could not decode image: {0}")]
pub struct DecodeError(#[from] pub image::ImageError);

/// Request-level failures of the predictor. Inference failures never show up
/// here since they are absorbed by the rule-based fallback.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub type PredictResult<T> = Result<T, PredictError>;
