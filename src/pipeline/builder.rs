//! Builder for configuring pipeline instances

use std::sync::Arc;

use super::InferencePipeline;
use crate::model::LeafClassifier;
use crate::preprocess::{DISPLAY_DIMENSION_LIMIT, DISPLAY_MAX_DIMENSION};
use crate::providers::LeafDetector;
use crate::{LeafError, Result};

/// Builder for configuring pipeline instances.
pub struct PipelineBuilder {
    gate: Option<Arc<dyn LeafDetector>>,
    classifier: Option<Arc<LeafClassifier>>,
    display_max_dimension: u32,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            gate: None,
            classifier: None,
            display_max_dimension: DISPLAY_MAX_DIMENSION,
        }
    }

    /// Set the leaf gate.
    pub fn gate(mut self, gate: impl LeafDetector + 'static) -> Self {
        self.gate = Some(Arc::new(gate));
        self
    }

    /// Set a leaf gate that is shared elsewhere.
    pub fn shared_gate(mut self, gate: Arc<dyn LeafDetector>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Set the classifier. The pipeline takes ownership of the model handle.
    pub fn classifier(mut self, classifier: LeafClassifier) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Longest side of the preview image (default: 300, at most 4096).
    ///
    /// The gate payload is always built from the submitted image at 300 px.
    pub fn display_max_dimension(mut self, pixels: u32) -> Self {
        self.display_max_dimension = pixels;
        self
    }

    /// Build the pipeline.
    ///
    /// A classifier whose model failed to load is accepted: the pipeline
    /// reports it through `model_status` and returns "Error in Prediction"
    /// for leaves.
    pub fn build(self) -> Result<InferencePipeline> {
        let gate = self.gate.ok_or(LeafError::NoGate)?;
        let classifier = self.classifier.ok_or(LeafError::NoClassifier)?;
        if !(1..=DISPLAY_DIMENSION_LIMIT).contains(&self.display_max_dimension) {
            return Err(LeafError::Configuration(format!(
                "display max dimension must be between 1 and {DISPLAY_DIMENSION_LIMIT}, got {}",
                self.display_max_dimension
            )));
        }

        Ok(InferencePipeline::new(
            gate,
            classifier,
            self.display_max_dimension,
        ))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
