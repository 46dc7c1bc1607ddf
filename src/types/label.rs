//! Verdict and result label types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scores strictly above this are healthy.
pub const HEALTHY_THRESHOLD: f32 = 0.5;

/// Binary health verdict of the local classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthLabel {
    Healthy,
    Unhealthy,
}

/// Scalar output of the local model, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ClassificationScore(f32);

impl ClassificationScore {
    /// Wrap a raw model output. Returns `None` for non-finite values or
    /// values outside `[0, 1]`.
    pub fn new(value: f32) -> Option<Self> {
        (value.is_finite() && (0.0..=1.0).contains(&value)).then_some(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// `Healthy` iff score > 0.5; exactly 0.5 is `Unhealthy`.
    pub fn label(self) -> HealthLabel {
        if self.0 > HEALTHY_THRESHOLD {
            HealthLabel::Healthy
        } else {
            HealthLabel::Unhealthy
        }
    }
}

/// Terminal result of one pipeline run.
///
/// `Display` renders the fixed user-facing label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineResult {
    Healthy,
    Unhealthy,
    LeafMissing,
    PredictionError,
    ImageNotFound,
}

impl PipelineResult {
    /// The user-facing label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Unhealthy => "Unhealthy",
            Self::LeafMissing => "Leaf missing",
            Self::PredictionError => "Error in Prediction",
            Self::ImageNotFound => "Error: Image not found",
        }
    }

    /// Whether this result is one of the two error labels.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::PredictionError | Self::ImageNotFound)
    }
}

impl From<HealthLabel> for PipelineResult {
    fn from(label: HealthLabel) -> Self {
        match label {
            HealthLabel::Healthy => Self::Healthy,
            HealthLabel::Unhealthy => Self::Unhealthy,
        }
    }
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
