pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod preprocess;
pub mod protocol;
pub mod server;
pub mod types;

pub use artifacts::{ArtifactContext, ArtifactPaths};
pub use config::ServerConfig;
pub use error::{DecodeError, PredictError, ValidationError};
pub use orchestrator::{
    FallbackReason, PredictionOutcome, PredictionRequest, Predictor, PropertyBounds,
};
pub use types::{Method, PhysicalProperties, PredictionResult};
