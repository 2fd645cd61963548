//! ONNX Runtime session for an exported ViT image classifier.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::Value;

use crate::error::ModelError;

use super::predictor::Classifier;

/// Preferred name of the classifier output.
const LOGITS_OUTPUT: &str = "logits";

/// Wraps an ONNX Runtime session producing per-label logits.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// Output to read: `logits` if present, else the first output.
    output_name: String,
    path: PathBuf,
}

impl OnnxClassifier {
    /// Load a classifier from an `.onnx` file.
    pub fn load(model_path: &Path) -> Result<Self, ModelError> {
        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| ModelError::Load {
                path: model_path.to_path_buf(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| ModelError::Load {
                path: model_path.to_path_buf(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());

        let outputs: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        let output_name = outputs
            .iter()
            .find(|name| name.as_str() == LOGITS_OUTPUT)
            .or_else(|| outputs.first())
            .cloned()
            .ok_or_else(|| ModelError::Load {
                path: model_path.to_path_buf(),
                message: "Model declares no outputs".to_string(),
            })?;

        tracing::debug!(
            "Loaded classifier from {:?} (input: {:?}, output: {:?})",
            model_path,
            input_name,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            path: model_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Classifier for OnnxClassifier {
    fn logits(&self, pixels: &Array4<f32>) -> Result<Array2<f32>, ModelError> {
        let batch_size = pixels.shape()[0];

        // (shape, flat_data) keeps us off ort's ndarray version coupling.
        let shape: Vec<i64> = pixels.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = pixels.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| ModelError::Inference(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| ModelError::Inference(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| ModelError::Inference(format!("ONNX inference failed: {e}")))?;

        let logits = outputs
            .iter()
            .find(|(name, _)| *name == self.output_name.as_str())
            .ok_or_else(|| {
                ModelError::Inference(format!("Model did not produce {}", self.output_name))
            })?;

        let (shape, data) = logits
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Inference(format!("Failed to extract logits: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let (rows, cols) = match dims.as_slice() {
            [rows, cols] => (*rows, *cols),
            [cols] if batch_size == 1 => (1, *cols),
            _ => {
                return Err(ModelError::ShapeMismatch {
                    expected: format!("[{batch_size}, L]"),
                    actual: format!("{dims:?}"),
                })
            }
        };

        Array2::from_shape_vec((rows, cols), data.to_vec()).map_err(|e| {
            ModelError::Inference(format!("Logits do not fit [{rows}, {cols}]: {e}"))
        })
    }
}
