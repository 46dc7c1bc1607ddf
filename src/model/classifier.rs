//! The shared classifier handle.
//!
//! A [`LeafClassifier`] is created once at startup and owns the local
//! model for the life of the process. Load failures are captured rather
//! than raised, so the caller can render a distinct error state while
//! every later classify fails fast. [`LeafClassifier::release`] drops the
//! model exactly once at shutdown.

use std::sync::RwLock;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::{LeafError, Result};
use crate::providers::traits::ScoreModel;
use crate::telemetry;
use crate::types::{ClassificationScore, NormalizedTensor};

/// Observable state of the classifier model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// Loaded and ready to classify.
    Ready { name: String },
    /// Loading failed at startup.
    Failed { reason: String },
    /// Released at shutdown.
    Released,
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

enum ModelState {
    Loaded(Box<dyn ScoreModel>),
    Failed(String),
    Released,
}

/// Binary leaf health classifier over one pre-loaded model.
pub struct LeafClassifier {
    state: RwLock<ModelState>,
}

impl LeafClassifier {
    /// Wrap an already-loaded model.
    pub fn new(model: impl ScoreModel + 'static) -> Self {
        info!(model = model.name(), "leaf classifier ready");
        Self {
            state: RwLock::new(ModelState::Loaded(Box::new(model))),
        }
    }

    /// Build from the outcome of a load attempt.
    ///
    /// A failed load yields a classifier in the `Failed` state instead of an
    /// error, so startup can continue and report it.
    pub fn from_load<M: ScoreModel + 'static>(loaded: Result<M>) -> Self {
        match loaded {
            Ok(model) => Self::new(model),
            Err(e) => {
                error!(error = %e, "failed to load leaf classifier model");
                Self::unavailable(e.to_string())
            }
        }
    }

    /// A classifier with no model; every classify fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(ModelState::Failed(reason.into())),
        }
    }

    /// Load the ONNX artifact at `model_path`.
    #[cfg(feature = "onnx")]
    pub fn load_onnx(model_path: impl AsRef<std::path::Path>, device: crate::model::Device) -> Self {
        Self::from_load(crate::providers::OnnxScoreModel::load(model_path, device))
    }

    /// Current model status.
    pub fn status(&self) -> ModelStatus {
        match self.state.read() {
            Ok(state) => match &*state {
                ModelState::Loaded(model) => ModelStatus::Ready {
                    name: model.name().to_string(),
                },
                ModelState::Failed(reason) => ModelStatus::Failed {
                    reason: reason.clone(),
                },
                ModelState::Released => ModelStatus::Released,
            },
            Err(e) => ModelStatus::Failed {
                reason: format!("classifier state poisoned: {e}"),
            },
        }
    }

    /// Score a normalized tensor with the loaded model.
    ///
    /// Never reloads the model. Fails fast with `ModelUnavailable` or
    /// `ModelReleased` when there is no model, and with `Classification`
    /// when the output is not a finite value in `[0, 1]`.
    pub fn classify(&self, tensor: &NormalizedTensor) -> Result<ClassificationScore> {
        let state = self.state.read().map_err(|e| {
            LeafError::Classification(format!("Failed to acquire read lock: {e}"))
        })?;

        let model = match &*state {
            ModelState::Loaded(model) => model,
            ModelState::Failed(reason) => return Err(LeafError::ModelUnavailable(reason.clone())),
            ModelState::Released => return Err(LeafError::ModelReleased),
        };

        let start = Instant::now();
        let raw = model.score(tensor);
        metrics::histogram!(telemetry::CLASSIFY_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());

        let raw = raw?;
        debug!(model = model.name(), score = raw, "classifier output");

        ClassificationScore::new(raw).ok_or_else(|| {
            LeafError::Classification(format!("model output {raw} is not a score in [0, 1]"))
        })
    }

    /// Drop the model. Returns `true` only for the call that released it.
    pub fn release(&self) -> bool {
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        match std::mem::replace(&mut *state, ModelState::Released) {
            ModelState::Loaded(model) => {
                info!(model = model.name(), "releasing leaf classifier model");
                drop(model);
                true
            }
            ModelState::Failed(reason) => {
                // nothing loaded; keep the failure visible
                *state = ModelState::Failed(reason);
                false
            }
            ModelState::Released => false,
        }
    }
}
