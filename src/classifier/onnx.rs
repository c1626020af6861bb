//! ONNX Runtime backend for the learned classifier.
//!
//! The exported model takes two inputs, the image batch `[1, H, W, 3]` and the
//! scaled features `[1, 2]`, and returns class probabilities `[1, N]`.
//!
//! `Session::run` needs exclusive access, so the model is loaded into a pool
//! of sessions and each forward pass borrows one of them.

use std::path::{Path, PathBuf};

use ort::{session::Session, value::TensorRef};

use super::{InferenceError, MineralClassifier, SessionPool};
use crate::artifacts::ArtifactError;
use crate::preprocess::{ImageTensor, TabularFeatures};

pub struct OnnxClassifier {
    sessions: SessionPool<Session>,
    image_input: String,
    tabular_input: String,
    output: String,
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("image_input", &self.image_input)
            .field("tabular_input", &self.tabular_input)
            .field("output", &self.output)
            .field("model_path", &self.model_path)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl OnnxClassifier {
    /// Load the model into `pool_size` sessions (at least one). Inputs are
    /// taken in declaration order (image first, tabular second), the output is
    /// the first declared one.
    pub fn load(path: impl AsRef<Path>, pool_size: usize) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let model_error = |reason: String| ArtifactError::Model {
            path: path.to_path_buf(),
            reason,
        };
        let new_session = || {
            Session::builder()
                .and_then(|b| b.commit_from_file(path))
                .map_err(|e| model_error(format!("failed to create ONNX session: {}", e)))
        };

        let session = new_session()?;

        let inputs: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let [image_input, tabular_input] = <[String; 2]>::try_from(inputs).map_err(|inputs| {
            model_error(format!(
                "expected 2 model inputs (image, tabular), found {:?}",
                inputs
            ))
        })?;
        let output = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| model_error("model declares no outputs".to_string()))?;

        let pool_size = pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        sessions.push(session);
        for _ in 1..pool_size {
            sessions.push(new_session()?);
        }
        let sessions = SessionPool::new(sessions)
            .ok_or_else(|| model_error("empty session pool".to_string()))?;

        log::info!(
            "Loaded ONNX model {} (inputs: {}, {}; output: {}; sessions: {})",
            path.display(),
            image_input,
            tabular_input,
            output,
            sessions.len()
        );

        Ok(Self {
            sessions,
            image_input,
            tabular_input,
            output,
            model_path: path.to_path_buf(),
        })
    }
}

impl MineralClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        self.model_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("onnx")
    }

    fn predict_proba(
        &self,
        image: &ImageTensor,
        features: &TabularFeatures,
    ) -> Result<Vec<f32>, InferenceError> {
        let backend =
            |stage: &str, e: ort::Error| InferenceError::Backend(format!("{}: {}", stage, e));

        let image_batch = image.to_batch();
        let tabular_batch = features.to_batch();
        let image_tensor = TensorRef::from_array_view(image_batch.view())
            .map_err(|e| backend("image tensor conversion", e))?;
        let tabular_tensor = TensorRef::from_array_view(tabular_batch.view())
            .map_err(|e| backend("tabular tensor conversion", e))?;

        let inputs = ort::inputs![
            self.image_input.as_str() => image_tensor,
            self.tabular_input.as_str() => tabular_tensor
        ];

        let (idx, mut session) = self.sessions.acquire()?;
        let outputs = session
            .run(inputs)
            .map_err(|e| backend(&format!("forward pass on session {}", idx), e))?;
        let (shape, data) = outputs[self.output.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| backend("output extraction", e))?;

        if shape.len() != 2 || shape[0] != 1 {
            return Err(InferenceError::InvalidOutput(format!(
                "expected output shape [1, N], got {:?}",
                &shape[..]
            )));
        }
        Ok(data.to_vec())
    }
}
