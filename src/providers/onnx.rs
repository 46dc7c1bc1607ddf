//! Local health scoring via ONNX Runtime.
//!
//! Runs the bundled binary classifier: one float32 input of shape
//! `(1, 150, 150, 3)`, one float32 output of shape `(1, 1)`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use tracing::info;

use super::traits::ScoreModel;
use crate::error::{LeafError, Result};
use crate::model::Device;
use crate::types::NormalizedTensor;

/// Default artifact file name, resolved relative to the working directory.
pub const DEFAULT_MODEL_FILE: &str = "model.onnx";

/// ONNX Runtime backend for the leaf health model.
pub struct OnnxScoreModel {
    // ort sessions need `&mut` to run; the lock serializes invocations
    // without exposing mutability to callers.
    session: Mutex<Session>,
    name: String,
    #[allow(dead_code)]
    device: Device,
}

impl OnnxScoreModel {
    /// Load the model artifact from `model_path`.
    pub fn load(model_path: impl AsRef<Path>, device: Device) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(LeafError::ModelLoad(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        let session = build_session(model_path, &device)?;
        let name = model_name(model_path);
        info!(model = %name, device = device.name(), "loaded leaf health model");

        Ok(Self {
            session: Mutex::new(session),
            name,
            device,
        })
    }

    /// Run the session and return the flat output values.
    fn run(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>> {
        let input = TensorRef::from_array_view((NormalizedTensor::SHAPE, tensor.as_slice()))
            .map_err(|e| {
                LeafError::Classification(format!("Failed to create input tensor: {e}"))
            })?;

        // a panic in an earlier run leaves the session itself intact
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| LeafError::Classification(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            LeafError::Classification(format!("Failed to extract output tensor: {e}"))
        })?;

        let elements: i64 = shape.iter().product();
        if elements != 1 {
            return Err(LeafError::Classification(format!(
                "Expected a single output value, got shape {shape:?}"
            )));
        }

        Ok(data.to_vec())
    }
}

impl ScoreModel for OnnxScoreModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, tensor: &NormalizedTensor) -> Result<f32> {
        self.run(tensor)?
            .first()
            .copied()
            .ok_or_else(|| LeafError::Classification("Empty model output".to_string()))
    }
}

fn model_name(model_path: &Path) -> String {
    model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("onnx")
        .to_string()
}

/// Resolve the artifact path: explicit path, else `LEAFCHECK_MODEL_PATH`,
/// else [`DEFAULT_MODEL_FILE`].
pub fn resolve_model_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("LEAFCHECK_MODEL_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_FILE))
}

/// Build an ONNX session with the appropriate execution provider.
fn build_session(model_path: &Path, device: &Device) -> Result<Session> {
    let builder = Session::builder()
        .map_err(|e| LeafError::ModelLoad(format!("Failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| LeafError::ModelLoad(format!("Failed to set optimization level: {e}")))?;

    // Configure execution provider based on device
    let mut builder = match device {
        Device::Cpu => builder,
        #[cfg(feature = "cuda")]
        Device::Cuda { device_id } => {
            use ort::execution_providers::CUDAExecutionProvider;
            builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(*device_id as i32)
                    .build()])
                .map_err(|e| LeafError::ModelLoad(format!("Failed to configure CUDA: {e}")))?
        }
    };

    builder
        .commit_from_file(model_path)
        .map_err(|e| LeafError::ModelLoad(format!("Failed to load ONNX model: {e}")))
}
